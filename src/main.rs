mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use relaybox::config::Config;
use relaybox::observability;
use relaybox::server;
use relaybox::state::AppState;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = Config::load()?;
    observability::init(&config.telemetry);

    // Loading ran before the subscriber existed; report the source now
    let source = Config::source_path();
    if source.exists() {
        info!(path = %source.display(), "Loaded configuration file");
    } else {
        warn!(path = %source.display(), "Configuration file not found, using defaults and environment");
    }

    let state = AppState::open(config)?;

    match cli.command {
        Commands::Serve(args) => {
            let address = args.address.unwrap_or(state.config.server.bind_addr);
            server::run(state, address).await?;
        }
        Commands::Stats => {
            let snapshot = state.stats.snapshot()?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Sweep => {
            let max_age = state.config.retention.ledger_ttl.as_time_delta();
            let pruned = state.ledger.expire_older_than(max_age)?;
            state.db.persist()?;
            println!("expired {} ledger records", pruned.records_expired);
        }
    }

    Ok(())
}
