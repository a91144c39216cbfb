//! Landmark guide example
//!
//! Streams a guide for the coordinates given on the command line (default: the
//! Louvre). Places come from a small static table of Paris sights rather than a
//! live map service.
//!
//! Run with: cargo run --example landmarks -- 48.8610 2.3360 [radius_meters]

use anyhow::Context;
use recommender::llm::gateways::OllamaGateway;
use recommender::prelude::*;
use recommender::providers::{Coordinate, PointOfInterestCategory, StaticPlaceSearch};
use recommender::recommend::LandmarkRecommenderPlus;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn paris() -> StaticPlaceSearch {
    use PointOfInterestCategory::*;

    StaticPlaceSearch::new()
        .place("Musée du Louvre", Coordinate::new(48.8606, 2.3376), Museum)
        .place("Jardin des Tuileries", Coordinate::new(48.8635, 2.3275), Park)
        .place("Palais Garnier", Coordinate::new(48.8720, 2.3316), Theater)
        .place("Musée d'Orsay", Coordinate::new(48.8600, 2.3266), Museum)
        .place("Sainte-Chapelle", Coordinate::new(48.8554, 2.3450), Landmark)
        .place("Sorbonne", Coordinate::new(48.8487, 2.3430), University)
        .place("Jardin du Luxembourg", Coordinate::new(48.8462, 2.3372), Park)
        .place("Tour Eiffel", Coordinate::new(48.8584, 2.2945), Landmark)
        .place("Parc des Princes", Coordinate::new(48.8414, 2.2530), Stadium)
}

fn argument(args: &[String], index: usize, default: f64) -> anyhow::Result<f64> {
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("argument {} is not a number: {}", index + 1, raw)),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let coordinate = Coordinate::new(argument(&args, 0, 48.8606)?, argument(&args, 1, 2.3376)?);
    let radius = args.get(2).map(|_| argument(&args, 2, 1_500.0)).transpose()?;

    let config = RecommenderConfig::from_env()?;
    let gateway = Arc::new(OllamaGateway::with_config(config.ollama.clone()));
    let recommender = LandmarkRecommenderPlus::new(gateway, &config, Arc::new(paris()))?;

    println!("Planning around {:?}\n", coordinate);

    let mut updates = recommender.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            let Some(guide) = state.result else { continue };

            println!("Hint: {}", guide.hint.unwrap_or_default());
            for landmark in guide.landmarks.unwrap_or_default() {
                println!(
                    "  {} ({})",
                    landmark.name.unwrap_or_default(),
                    landmark.rating.map(|r| r.to_string()).unwrap_or_default()
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

    let outcome = recommender.generate(coordinate, radius, &cancel).await;
    println!("\nOutcome: {:?}", outcome);
    if let Some(error) = recommender.last_error() {
        eprintln!("Error: {}", error);
    }

    drop(recommender);
    printer.await?;
    Ok(())
}
