//! Per-block arbitrage loop
//!
//! Each new block refreshes reserves, evaluates the snapshot and hands the
//! ranked crossed markets to the submission pipeline. Only one block is
//! processed at a time; blocks arriving meanwhile are dropped.

use alloy_primitives::U256;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use crossarb_detector::ArbitrageEvaluator;
use crossarb_executor::{BundleRelay, GasEstimator, SubmissionPipeline, SubmissionReceipt};
use crossarb_markets::{ContractCaller, MarketLoader, MarketRegistry};

use crate::chain::{BlockPoller, BlockSource};

/// Allows a single block invocation at a time
#[derive(Debug, Clone)]
pub struct InFlightGuard {
    permits: Arc<Semaphore>,
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// `None` while another invocation holds the permit
    pub fn try_start(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).try_acquire_owned().ok()
    }
}

/// Pings an uptime monitor after each successful submission
#[derive(Debug, Clone)]
pub struct Healthcheck {
    http: reqwest::Client,
    url: String,
}

impl Healthcheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub async fn ping(&self) {
        match self.http.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => debug!("Healthcheck ok"),
            Ok(response) => warn!("Healthcheck returned {}", response.status()),
            Err(e) => warn!("Healthcheck failed: {}", e),
        }
    }
}

/// What happened for one block
#[derive(Debug)]
pub enum BlockOutcome {
    NoCrossedMarkets,
    Submitted(SubmissionReceipt),
}

pub struct BlockRunner<C, R, G> {
    chain: C,
    registry: Arc<MarketRegistry>,
    loader: MarketLoader<C>,
    evaluator: Arc<ArbitrageEvaluator>,
    pipeline: SubmissionPipeline<R, G>,
    healthcheck: Option<Healthcheck>,
    poll_interval: Duration,
    guard: InFlightGuard,
}

impl<C, R, G> BlockRunner<C, R, G>
where
    C: BlockSource + ContractCaller + 'static,
    R: BundleRelay + 'static,
    G: GasEstimator + 'static,
{
    pub fn new(
        chain: C,
        registry: Arc<MarketRegistry>,
        loader: MarketLoader<C>,
        evaluator: ArbitrageEvaluator,
        pipeline: SubmissionPipeline<R, G>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            chain,
            registry,
            loader,
            evaluator: Arc::new(evaluator),
            pipeline,
            healthcheck: None,
            poll_interval,
            guard: InFlightGuard::new(),
        }
    }

    pub fn with_healthcheck(mut self, healthcheck: Option<Healthcheck>) -> Self {
        self.healthcheck = healthcheck;
        self
    }

    fn min_weth_liquidity(&self) -> U256 {
        self.loader.config().min_weth_liquidity
    }

    /// Refresh, evaluate and submit for one block
    pub async fn process_block(&self, number: u64) -> anyhow::Result<BlockOutcome> {
        let start = Instant::now();
        let block = self.chain.block_context(number).await?;

        self.loader.update_reserves(&self.registry).await?;
        self.registry.set_block(number);
        let stats = self.registry.stats();
        debug!(
            "[{}] Reserves refreshed for {} pairs ({} updates, last {:?} ago)",
            self.registry.block(),
            stats.pair_count,
            stats.update_count,
            stats.last_update_age
        );

        let snapshot = self.registry.markets_by_token(self.min_weth_liquidity());
        let evaluator = Arc::clone(&self.evaluator);
        let crossed = tokio::task::spawn_blocking(move || evaluator.evaluate_markets(&snapshot)).await?;

        if crossed.is_empty() {
            info!("[{}] No crossed markets ({:?})", number, start.elapsed());
            return Ok(BlockOutcome::NoCrossedMarkets);
        }

        for market in &crossed {
            info!("[{}] {}", number, market);
        }

        let receipt = self.pipeline.take_crossed_markets(&crossed, &block).await?;
        info!(
            "[{}] Submitted {} after {} candidates in {:?}",
            number,
            receipt.token,
            receipt.attempted,
            start.elapsed()
        );

        if let Some(healthcheck) = &self.healthcheck {
            healthcheck.ping().await;
        }

        Ok(BlockOutcome::Submitted(receipt))
    }

    /// Poll for new blocks until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: oneshot::Receiver<()>) {
        info!("Starting block runner");

        let mut poller = BlockPoller::new();
        let mut interval = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let number = match self.chain.block_number().await {
                        Ok(n) => n,
                        Err(e) => {
                            warn!("Failed to fetch block number: {:#}", e);
                            continue;
                        }
                    };
                    let Some(number) = poller.observe(number) else { continue };

                    let Some(permit) = self.guard.try_start() else {
                        warn!("Block {} arrived while the previous block is still running, skipping", number);
                        continue;
                    };

                    let runner = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = runner.process_block(number).await {
                            error!("Block {} failed: {:#}", number, e);
                        }
                        drop(permit);
                    });
                }
                _ = &mut shutdown => {
                    info!("Block runner shutdown requested");
                    break;
                }
            }
        }
    }
}
