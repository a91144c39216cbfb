//! Coffee recommendation example
//!
//! Streams a recommendation from Alex's Coffee for the query given on the command
//! line. The model searches the menu by tag through `coffeetoolplus`.
//!
//! Run with: cargo run --example coffee -- "something sweet with oat milk"

use recommender::llm::gateways::OllamaGateway;
use recommender::prelude::*;
use recommender::recommend::CoffeeIntelligencePlus;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let query = if query.trim().is_empty() {
        "Something sweet and creamy, but not too strong".to_string()
    } else {
        query
    };

    let config = RecommenderConfig::from_env()?;
    let gateway = Arc::new(OllamaGateway::with_config(config.ollama.clone()));
    let intelligence = CoffeeIntelligencePlus::new(gateway, &config)?;

    println!("Query: {}\n", query);

    let mut updates = intelligence.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if let Some(pick) = state.result {
                println!(
                    "{} | {} | {}",
                    pick.name.unwrap_or_default(),
                    pick.description.unwrap_or_default(),
                    pick.reason.unwrap_or_default()
                );
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = intelligence.generate(&query, &cancel).await;
    println!("\nOutcome: {:?}", outcome);
    if let Some(error) = intelligence.last_error() {
        eprintln!("Error: {}", error);
    }

    drop(intelligence);
    printer.await?;
    Ok(())
}
