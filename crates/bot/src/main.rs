//! Crossarb - crossed-market arbitrage bot
//!
//! Main entry point

use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::Address;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crossarb_bot::{AppConfig, BalanceMonitor, BlockRunner, ChainClient, FlashbotsRelay, Healthcheck, NodeConfig};
use crossarb_core::weth_address;
use crossarb_detector::ArbitrageEvaluator;
use crossarb_executor::{BundleBuilder, SubmissionPipeline};
use crossarb_markets::{MarketLoader, MarketRegistry};

#[derive(Parser)]
#[command(name = "crossarb")]
#[command(version, about = "Crossed-market arbitrage across Uniswap V2 style pairs")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (TOML), read before the environment
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch every block for crossed markets and submit bundles
    Run,

    /// Print a freshly generated private key
    Genpk,

    /// Log an account's WETH balance whenever it changes
    MonitorBalance {
        /// Account to watch
        address: Address,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Fires on Ctrl+C or SIGTERM
fn shutdown_signal() -> oneshot::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C");
            }
            _ = terminate => {
                info!("Received termination signal");
            }
        }

        let _ = shutdown_tx.send(());
    });

    shutdown_rx
}

fn parse_key(key: &str, name: &str) -> anyhow::Result<PrivateKeySigner> {
    key.parse::<PrivateKeySigner>()
        .with_context(|| format!("{} is not a valid private key", name))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let chain_id = config.chain();
    let base_token = weth_address(chain_id);
    info!("Network: {} (chain id {})", chain_id, chain_id.chain_id());

    let chain = ChainClient::connect(&config.rpc_url()?).await?;

    let wallet = parse_key(&config.private_key, "PRIVATE_KEY")?;
    let auth_signer = match &config.flashbots_relay_signing_key {
        Some(key) => parse_key(key, "FLASHBOTS_RELAY_SIGNING_KEY")?,
        None => {
            warn!("FLASHBOTS_RELAY_SIGNING_KEY not set, using a random key. Relay reputation will not persist");
            PrivateKeySigner::random()
        }
    };
    info!("Searcher wallet address: {}", wallet.address());
    info!("Flashbots relay signing key address: {}", auth_signer.address());

    let execution = config.execution_config();
    let builder = BundleBuilder::new(
        chain_id.chain_id(),
        base_token,
        config.bundle_executor_address,
        wallet.address(),
        execution.clone(),
    );
    let relay = FlashbotsRelay::new(chain_id.flashbots_relay(), auth_signer, wallet, chain.clone());
    let pipeline = SubmissionPipeline::new(relay, chain.clone(), builder, execution);

    let registry = Arc::new(MarketRegistry::new(base_token));
    let loader = MarketLoader::new(chain.clone(), config.loader.clone());
    loader.discover(&registry).await.context("discovering markets")?;

    let stats = registry.stats();
    info!("Tracking {} pairs across {} tokens", stats.pair_count, stats.token_count);

    let evaluator = ArbitrageEvaluator::new(config.evaluation.clone(), base_token);
    let runner = BlockRunner::new(chain, registry, loader, evaluator, pipeline, config.poll_interval())
        .with_healthcheck(config.healthcheck_url.clone().map(Healthcheck::new));

    Arc::new(runner).run(shutdown_signal()).await;
    Ok(())
}

async fn monitor_balance(config: NodeConfig, account: Address) -> anyhow::Result<()> {
    let chain = ChainClient::connect(&config.rpc_url()?).await?;
    let monitor = BalanceMonitor::new(chain.clone(), weth_address(config.chain()), account);
    monitor.run(chain, config.poll_interval(), shutdown_signal()).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json);

    info!("Starting crossarb v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Genpk => {
            let signer = PrivateKeySigner::random();
            println!("{}", signer.to_bytes());
            return Ok(());
        }
        Commands::Run => {
            let config = AppConfig::load(cli.config.as_deref())?;
            run(config).await
        }
        Commands::MonitorBalance { address } => {
            let config = NodeConfig::load(cli.config.as_deref())?;
            monitor_balance(config, address).await
        }
    };

    if let Err(e) = &result {
        error!("Fatal: {:#}", e);
    }
    info!("Shutdown complete");
    result
}
