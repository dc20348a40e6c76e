use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bsd_client::{BsdClient, BsdCredentials, RequestSigner};
use turnout_common::{Clock, Config, SystemClock};
use turnout_ingest::{IngestionDriver, ReconciliationEngine};
use turnout_store::PgEventStore;

/// Pull events from the BSD event search API into the local event store.
#[derive(Parser, Debug)]
#[command(name = "ingest")]
struct Args {
    /// Translate and log events without touching the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("turnout=info".parse()?)
                .add_directive("bsd_client=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!(dry_run = args.dry_run, "Turnout ingest starting...");

    // Load config
    let config = Config::from_env()?;
    config.log_redacted();

    let credentials = BsdCredentials::new(
        &config.bsd_endpoint,
        &config.bsd_api_id,
        &config.bsd_api_secret,
    );
    let signer = RequestSigner::new(credentials, &config.bsd_call_path)?;
    let source = Arc::new(BsdClient::new()?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let driver = if args.dry_run {
        IngestionDriver::dry_run(signer, source, clock)
    } else {
        let store = PgEventStore::connect(config.database_url()?)
            .await
            .context("Failed to connect to Postgres")?;
        store.ensure_schema().await?;

        let engine = ReconciliationEngine::new(Arc::new(store), clock.clone());
        IngestionDriver::new(signer, source, clock, engine)
    };

    let stats = driver.run().await?;
    info!("Ingest run complete. {stats}");

    Ok(())
}
