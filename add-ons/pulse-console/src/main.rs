//! Pulse console
//!
//! Interactive front end for the dashboard adapter registry. Plain text is routed to the best
//! adapter; slash commands expose the aggregated context, cross-app totals and search.
//!
//! Usage: `pulse-console [--seed]`

mod seed;

use pulse_core::{
    AdapterContext, AdapterRegistry, ChangeChannel, KeyValueStore, PulseConfig, SledStore,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const HELP: &str = "Ask anything, or: /context  /totals  /search <text>  /apps  /help  /quit";

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[pulse-console] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = PulseConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config not loaded, using defaults");
        PulseConfig::default()
    });

    let store = Arc::new(SledStore::open_path(&config.store_path)?);
    if std::env::args().skip(1).any(|a| a == "--seed") {
        let written = seed::seed_demo_data(store.as_ref())?;
        println!("Seeded {} keys into {}", written, config.store_path);
    }

    let changes = ChangeChannel::new();
    let forwarder = store.forward_changes(changes.clone());

    let ctx = AdapterContext::from_config(store.clone(), &config).with_changes(changes);
    let mut registry = AdapterRegistry::from_config(&config);
    pulse_adapters::register_defaults(&mut registry, &ctx);

    tracing::info!(
        store_path = %config.store_path,
        adapters = registry.len(),
        keys = store.keys().map(|k| k.len()).unwrap_or(0),
        semantic = config.semantic_url.is_some(),
        "Pulse console started"
    );
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle(&registry, line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down console");
                break;
            }
        }
    }

    forwarder.abort();
    store.flush()?;
    Ok(())
}

/// Executes one input line. Returns `false` when the session should end.
async fn handle(registry: &AdapterRegistry, input: &str) -> bool {
    if input.is_empty() {
        return true;
    }
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (input, ""),
    };
    match command {
        "/quit" | "/exit" => return false,
        "/help" => println!("{}", HELP),
        "/apps" => println!("{}", registry.app_names().join(", ")),
        "/context" => println!("{}", registry.aggregated_context().prompt_block()),
        "/totals" => {
            let totals = registry.cross_app_totals();
            if totals.is_empty() {
                println!("No cross-app totals.");
            }
            for total in totals.values() {
                let breakdown = total
                    .by_app
                    .iter()
                    .map(|(app, n)| format!("{} {}", app, n))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{}: {} ({})", total.label, total.total, breakdown);
            }
        }
        "/search" if rest.is_empty() => println!("Usage: /search <text>"),
        "/search" => {
            let hits = registry.search_all(rest).await;
            if hits.is_empty() {
                println!("Nothing found for \"{}\".", rest);
            }
            for hit in hits {
                println!("[{}] {} · {}: {}", hit.app_name, hit.found.label, hit.found.field, hit.found.value);
            }
        }
        _ if command.starts_with('/') => println!("Unknown command. {}", HELP),
        _ => match registry.answer(input).await {
            Some(routed) => match routed.answer {
                Some(answer) => println!("[{} {}] {}", routed.app_name, routed.confidence, answer),
                None => println!(
                    "[{} {}] (deferred to the general assistant)",
                    routed.app_name, routed.confidence
                ),
            },
            None => println!("No dashboard app can answer that; the general assistant would take it."),
        },
    }
    true
}
