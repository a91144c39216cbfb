//! Formula One standings example
//!
//! Fetches the current drivers' championship from the Ergast-compatible API and
//! streams a summary of the top three.
//!
//! Run with: cargo run --example formula_one

use recommender::llm::gateways::OllamaGateway;
use recommender::prelude::*;
use recommender::providers::ErgastRankingProvider;
use recommender::recommend::FormulaOneIntelligence;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RecommenderConfig::from_env()?;
    let gateway = Arc::new(OllamaGateway::with_config(config.ollama.clone()));
    let intelligence =
        FormulaOneIntelligence::new(gateway, &config, Arc::new(ErgastRankingProvider::new()))?;

    let mut updates = intelligence.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            let Some(stats) = state.result else { continue };

            // A row is final once the next one has started or the stream ended
            let drivers = stats.drivers.unwrap_or_default();
            let settled = if state.is_loading {
                drivers.len().saturating_sub(1)
            } else {
                drivers.len()
            };
            for driver in drivers.iter().take(settled).skip(printed) {
                println!(
                    "P{} {} ({} pts)",
                    driver.position.unwrap_or_default(),
                    driver.name.clone().unwrap_or_default(),
                    driver.points.unwrap_or_default()
                );
                printed += 1;
            }
            if !state.is_loading {
                if let Some(summary) = stats.summary {
                    println!("\n{}", summary);
                }
            }
        }
    });

    let outcome = intelligence.generate(&CancellationToken::new()).await;
    println!("\nOutcome: {:?}", outcome);
    if let Some(error) = intelligence.last_error() {
        eprintln!("Error: {}", error);
    }

    drop(intelligence);
    printer.await?;
    Ok(())
}
