// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blu Maze route quote tool
//!
//! Quotes a trip between two points the same way the rider app does:
//! Google Directions for the route, then the market's fare schedule.
//!
//! Usage: `blu-maze-quote <lat,lng> <lat,lng> [--estimate]`

use anyhow::{bail, Context};
use blu_maze::{
    config::Config,
    format::{format_currency, format_distance, format_duration},
    models::Coordinates,
    services::{route::estimate_quote, MapsClient, RoutePlanner, RouteService},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let estimate = args.iter().any(|a| a == "--estimate");
    let points: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let [origin, destination] = points.as_slice() else {
        bail!("usage: blu-maze-quote <lat,lng> <lat,lng> [--estimate]");
    };
    let origin = parse_coords(origin)?;
    let destination = parse_coords(destination)?;

    let config = Config::from_env().context("Failed to load configuration")?;

    let quote = if estimate {
        estimate_quote(origin, destination, &config.fare)
    } else {
        let routes = RouteService::new(MapsClient::from_config(&config), config.fare);
        routes
            .quote(origin, destination)
            .await
            .context("Could not calculate route")?
    };

    tracing::info!(
        distance_km = quote.distance,
        duration_min = quote.duration,
        price = quote.price,
        points = quote.route.len(),
        "Route quoted"
    );
    println!(
        "{}  {}  {}",
        format_distance(quote.distance),
        format_duration(quote.duration),
        format_currency(quote.price)
    );
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

fn parse_coords(value: &str) -> anyhow::Result<Coordinates> {
    let (lat, lng) = value
        .split_once(',')
        .with_context(|| format!("expected lat,lng but got {value:?}"))?;
    let coords = Coordinates::new(
        lat.trim().parse().context("invalid latitude")?,
        lng.trim().parse().context("invalid longitude")?,
    );
    if !coords.is_valid() {
        bail!("coordinates out of range: {value}");
    }
    Ok(coords)
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blu_maze=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
