//! Ledger daemon binary
//!
//! Opens the ledger and holds it until ctrl-c. The HTTP request layer lives
//! outside this crate and talks to the engine through the `Ledger` API.

use recycle_ledger::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting RecycleChain ledger server");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger
    let ledger = Ledger::open(config).await?;
    let stats = ledger.stats()?;
    tracing::info!(
        owner = %ledger.owner(),
        stats = %serde_json::to_string(&stats)?,
        "Ledger opened successfully"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down ledger server");
    ledger.shutdown().await?;
    Ok(())
}
