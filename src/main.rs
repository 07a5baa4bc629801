//! nexus-sync daemon entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nexus_sync::adapters::cache::MokaCacheStore;
use nexus_sync::adapters::chain::{HttpChainClient, MockChain};
use nexus_sync::adapters::ipfs::IpfsGateway;
use nexus_sync::adapters::sqlite::{initialize_database, SqliteAgentStore, SqliteTransactionLedger};
use nexus_sync::domain::ports::ChainClient;
use nexus_sync::{
    CacheLayer, Config, ConfigLoader, EventSubscriber, RetryPolicy, SyncProcessor,
};

#[derive(Parser)]
#[command(name = "nexus-sync", about = "Registry chain-state synchronization daemon", version)]
struct Cli {
    /// Path to a configuration file (defaults to ./nexus-sync.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync pipeline until interrupted
    Run(RunArgs),
    /// Print the ledger status snapshot
    Status,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Replay historical events before going live
    #[arg(long)]
    historical: bool,

    /// First block of the replay window (overrides configuration)
    #[arg(long)]
    from_block: Option<u64>,

    /// Use the in-memory mock ledger instead of the RPC endpoint
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    match cli.command {
        Commands::Run(args) => run(config, args).await,
        Commands::Status => status(config).await,
    }
}

async fn run(config: Config, args: RunArgs) -> anyhow::Result<()> {
    let pool = initialize_database(&config.database)
        .await
        .context("failed to initialize document store")?;

    let agents = Arc::new(SqliteAgentStore::new(pool.clone()));
    let ledger = Arc::new(SqliteTransactionLedger::new(pool.clone()));
    let cache = Arc::new(CacheLayer::new(
        Arc::new(MokaCacheStore::new(&config.cache)),
        &config.cache,
    ));
    let metadata = Arc::new(IpfsGateway::new(&config.metadata));

    let from_block = args.from_block.unwrap_or(config.sync.from_block);
    let historical = args.historical || config.sync.historical;

    let retry = RetryPolicy::from_config(&config.retry);
    let (chain, http_client): (Arc<dyn ChainClient>, Option<Arc<HttpChainClient>>) = if args.mock {
        tracing::warn!("running against the in-memory mock ledger");
        (Arc::new(MockChain::new()), None)
    } else {
        let client = Arc::new(
            HttpChainClient::connect(config.chain.clone(), retry)
                .context("failed to configure chain client")?,
        );
        client.start_event_poller(from_block).await;
        (client.clone(), Some(client))
    };

    let processor = Arc::new(SyncProcessor::new(agents, ledger, cache, metadata));
    let subscriber = EventSubscriber::new(chain, processor, config.sync.clone());

    subscriber.start(from_block, historical).await?;
    tracing::info!(from_block, historical, "sync pipeline running, ctrl-c to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");

    subscriber.stop().await;
    if let Some(client) = http_client {
        client.shutdown().await;
    }
    pool.close().await;
    Ok(())
}

async fn status(config: Config) -> anyhow::Result<()> {
    let retry = RetryPolicy::from_config(&config.retry);
    let client = HttpChainClient::connect(config.chain, retry)
        .context("failed to configure chain client")?;

    let status = client.status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
