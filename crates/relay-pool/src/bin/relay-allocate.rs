use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;
use tracing::{info, warn};

use nostr_protocol::Event;
use relay_pool::{allocate_resilient_relays, latest_declarations, PoolConfig};

#[derive(Debug, Parser)]
#[command(name = "relay-allocate")]
#[command(about = "Compute extra relays that keep contacts reachable")]
struct Args {
    /// Relays the user already reads from (default: NOSTR_RELAYS).
    #[arg(long)]
    relay: Vec<String>,
    /// Relay-list events: a JSON array or one event per line.
    #[arg(long)]
    metadata: PathBuf,
    /// Print the full allocation as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let user_relays = if args.relay.is_empty() {
        PoolConfig::from_env()?.relays
    } else {
        args.relay
    };

    let raw = tokio::fs::read_to_string(&args.metadata).await?;
    let values: Vec<Value> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw)?
    } else {
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?
    };

    let total = values.len();
    let events: Vec<Event> = values
        .into_iter()
        .filter_map(|value| match Event::from_value(value) {
            Ok(event) if event.verify() => Some(event),
            Ok(event) => {
                warn!(event_id = %event.id, "Skipping event that failed verification");
                None
            }
            Err(err) => {
                warn!(error = %err, "Skipping malformed event");
                None
            }
        })
        .collect();
    info!(total, accepted = events.len(), "Loaded relay-list events");

    let declarations = latest_declarations(&events);
    let allocation = allocate_resilient_relays(&user_relays, &declarations);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&allocation)?);
    } else {
        for relay in &allocation.relays {
            println!("{relay}");
        }
    }

    Ok(())
}
