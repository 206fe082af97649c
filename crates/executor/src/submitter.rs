//! Bundle submission pipeline
//!
//! Candidates are tried one at a time in ranked order. Each one moves through
//! `Estimating -> Signing -> Simulating -> Submitting`; a suspicious gas
//! estimate or a failed simulation rejects the candidate and the next one
//! starts over. The first candidate that reaches `Submitting` ends the run.

use alloy_primitives::{Address, I256, U256};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::fmt;
use tracing::{info, warn};

use crossarb_core::{format_ether, format_units, BlockContext, CrossedMarket, ExecutionConfig, ExecutionError, ExecutionResult};

use crate::builder::{ArbitrageBundle, BundleBuilder};
use crate::fees::FeeParams;
use crate::relay::{BundleRelay, BundleSubmission, GasEstimator, SignedBundle};
use crate::simulator::SimulationResult;

/// Number of consecutive blocks each bundle is submitted for
pub const SUBMISSION_BLOCKS: u64 = 2;

/// Why a candidate was passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    SuspiciousGasEstimate(u64),
    SimulationError(String),
    SimulationReverted { index: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::SuspiciousGasEstimate(gas) => {
                write!(f, "gas estimate succeeded but is suspiciously large: {}", gas)
            }
            RejectReason::SimulationError(message) => write!(f, "simulation error: {}", message),
            RejectReason::SimulationReverted { index } => {
                write!(f, "simulation reverted at transaction {}", index)
            }
        }
    }
}

/// Stages a single candidate moves through
#[derive(Debug, Clone)]
enum Stage {
    Estimating,
    Signing,
    Simulating(SignedBundle),
    Submitting(SignedBundle),
    Submitted(Vec<BundleSubmission>),
    Rejected(RejectReason),
}

/// Gas limit for the settlement transaction given its estimate.
///
/// A failed estimate falls back to the configured limit; an estimate above
/// the ceiling rejects the candidate.
pub fn settlement_gas_limit(estimate: &anyhow::Result<u64>, config: &ExecutionConfig) -> Result<u64, RejectReason> {
    match estimate {
        Ok(gas) if *gas > config.max_gas_estimate => Err(RejectReason::SuspiciousGasEstimate(*gas)),
        Ok(gas) => Ok(gas.saturating_mul(config.gas_limit_multiplier)),
        Err(_) => Ok(config.fallback_gas_limit),
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub token: Address,
    pub volume: U256,
    pub profit: I256,
    pub miner_reward: U256,
    pub gas_limit: u64,
    pub submissions: Vec<BundleSubmission>,
    /// Candidates tried, including the one submitted
    pub attempted: usize,
    pub rejections: Vec<(Address, RejectReason)>,
    pub submitted_at: DateTime<Utc>,
}

/// Drives ranked candidates through estimation, simulation and submission
pub struct SubmissionPipeline<R, G> {
    relay: R,
    estimator: G,
    builder: BundleBuilder,
    config: ExecutionConfig,
}

impl<R: BundleRelay, G: GasEstimator> SubmissionPipeline<R, G> {
    pub fn new(relay: R, estimator: G, builder: BundleBuilder, config: ExecutionConfig) -> Self {
        Self {
            relay,
            estimator,
            builder,
            config,
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Submit the best candidate that survives estimation and simulation.
    ///
    /// Fails with `UnsupportedFeeMarket` before touching any collaborator when
    /// the block has no base fee, and with `NoArbitrageSubmitted` once every
    /// candidate has been rejected. Relay transport errors propagate.
    pub async fn take_crossed_markets(
        &self,
        crossed_markets: &[CrossedMarket],
        block: &BlockContext,
    ) -> ExecutionResult<SubmissionReceipt> {
        let Some(fees) = FeeParams::for_block(block, &self.config) else {
            warn!("This chain is not EIP-1559 enabled. Stopping");
            return Err(ExecutionError::UnsupportedFeeMarket);
        };

        let mut rejections = Vec::new();

        for (attempt, opportunity) in crossed_markets.iter().enumerate() {
            info!(
                "Send this much WETH {} get this much profit {}",
                format_ether(opportunity.volume),
                format_ether(opportunity.profit.unsigned_abs())
            );

            let mut bundle = self.builder.build(opportunity, &fees)?;

            match self.run_candidate(&mut bundle, block).await? {
                Ok(submissions) => {
                    return Ok(SubmissionReceipt {
                        token: opportunity.token,
                        volume: opportunity.volume,
                        profit: opportunity.profit,
                        miner_reward: bundle.miner_reward,
                        gas_limit: bundle.settlement.gas_limit,
                        submissions,
                        attempted: attempt + 1,
                        rejections,
                        submitted_at: Utc::now(),
                    });
                }
                Err(reason) => {
                    info!("Skipping token {}: {}", opportunity.token, reason);
                    rejections.push((opportunity.token, reason));
                }
            }
        }

        Err(ExecutionError::NoArbitrageSubmitted {
            attempted: crossed_markets.len(),
        })
    }

    async fn run_candidate(
        &self,
        bundle: &mut ArbitrageBundle,
        block: &BlockContext,
    ) -> ExecutionResult<Result<Vec<BundleSubmission>, RejectReason>> {
        let mut stage = Stage::Estimating;
        loop {
            stage = match stage {
                Stage::Submitted(submissions) => return Ok(Ok(submissions)),
                Stage::Rejected(reason) => return Ok(Err(reason)),
                current => self.advance(current, bundle, block).await?,
            };
        }
    }

    async fn advance(&self, stage: Stage, bundle: &mut ArbitrageBundle, block: &BlockContext) -> ExecutionResult<Stage> {
        let next = match stage {
            Stage::Estimating => {
                let estimate = self
                    .estimator
                    .estimate_gas(&bundle.settlement, self.builder.searcher())
                    .await;
                if let Err(e) = &estimate {
                    warn!(
                        "Estimate gas failure, using fallback limit {}: {:#}",
                        self.config.fallback_gas_limit, e
                    );
                }
                match settlement_gas_limit(&estimate, &self.config) {
                    Ok(gas_limit) => {
                        bundle.set_settlement_gas_limit(gas_limit);
                        Stage::Signing
                    }
                    Err(reason) => Stage::Rejected(reason),
                }
            }
            Stage::Signing => {
                let signed = self.relay.sign_bundle(&bundle.transactions()).await?;
                Stage::Simulating(signed)
            }
            Stage::Simulating(signed) => match self.relay.simulate(&signed, block.number + 1).await? {
                SimulationResult::Error(message) => Stage::Rejected(RejectReason::SimulationError(message)),
                SimulationResult::Reverted { index } => Stage::Rejected(RejectReason::SimulationReverted { index }),
                result @ SimulationResult::Success { coinbase_diff, .. } => {
                    info!(
                        "Submitting bundle, profit sent to miner: {}, effective gas price: {} GWEI",
                        format_ether(coinbase_diff),
                        format_units(result.effective_gas_price().unwrap_or_default(), 9)
                    );
                    Stage::Submitting(signed)
                }
            },
            Stage::Submitting(signed) => {
                let targets = (1..=SUBMISSION_BLOCKS).map(|offset| block.number + offset);
                let submissions = try_join_all(targets.map(|target| self.relay.submit(&signed, target))).await?;
                for submission in &submissions {
                    info!(
                        "Bundle submitted for block {} ({:?})",
                        submission.target_block, submission.bundle_hash
                    );
                }
                Stage::Submitted(submissions)
            }
            done @ (Stage::Submitted(_) | Stage::Rejected(_)) => done,
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuiltTransaction;
    use alloy_primitives::Bytes;
    use async_trait::async_trait;
    use crossarb_core::{ether_div, ether_mul, DexProtocol, Market, RelayError, GWEI};
    use crossarb_markets::UniswapV2Pair;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum RelayCall {
        Sign(usize),
        Simulate(u64),
        Submit(u64),
    }

    /// Replays queued simulation results and records every call
    #[derive(Default)]
    struct FakeRelay {
        simulations: Mutex<VecDeque<SimulationResult>>,
        fail_submit: bool,
        calls: Mutex<Vec<RelayCall>>,
    }

    impl FakeRelay {
        fn with_simulations(results: Vec<SimulationResult>) -> Self {
            Self {
                simulations: Mutex::new(results.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<RelayCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl BundleRelay for FakeRelay {
        async fn sign_bundle(&self, transactions: &[BuiltTransaction]) -> ExecutionResult<SignedBundle> {
            self.calls.lock().push(RelayCall::Sign(transactions.len()));
            Ok(SignedBundle {
                transactions: transactions.iter().map(|tx| tx.data.clone()).collect(),
            })
        }

        async fn simulate(&self, _bundle: &SignedBundle, target_block: u64) -> Result<SimulationResult, RelayError> {
            self.calls.lock().push(RelayCall::Simulate(target_block));
            Ok(self
                .simulations
                .lock()
                .pop_front()
                .unwrap_or_else(|| SimulationResult::Error("no simulation queued".into())))
        }

        async fn submit(&self, _bundle: &SignedBundle, target_block: u64) -> Result<BundleSubmission, RelayError> {
            self.calls.lock().push(RelayCall::Submit(target_block));
            if self.fail_submit {
                return Err(RelayError::Transport("connection reset".into()));
            }
            Ok(BundleSubmission {
                target_block,
                bundle_hash: None,
            })
        }
    }

    /// Replays queued estimates, records the gas limits it was asked about
    #[derive(Default)]
    struct FakeEstimator {
        estimates: Mutex<VecDeque<anyhow::Result<u64>>>,
        seen: Mutex<Vec<Bytes>>,
    }

    impl FakeEstimator {
        fn with_estimates(estimates: Vec<anyhow::Result<u64>>) -> Self {
            Self {
                estimates: Mutex::new(estimates.into()),
                ..Default::default()
            }
        }

        fn call_count(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl GasEstimator for FakeEstimator {
        async fn estimate_gas(&self, transaction: &BuiltTransaction, _from: Address) -> anyhow::Result<u64> {
            self.seen.lock().push(transaction.data.clone());
            self.estimates
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no estimate queued")))
        }
    }

    fn weth() -> Address {
        Address::repeat_byte(0xee)
    }

    fn market(byte: u8, token: Address, token_reserve: u64) -> Arc<dyn Market> {
        Arc::new(
            UniswapV2Pair::new(Address::repeat_byte(byte), [token, weth()], DexProtocol::UniswapV2)
                .with_reserves(ether_mul(token_reserve), ether_mul(10)),
        )
    }

    fn candidate(token_byte: u8) -> CrossedMarket {
        let token = Address::repeat_byte(token_byte);
        CrossedMarket {
            profit: I256::from_raw(ether_div(100)),
            volume: ether_div(4),
            token,
            sell_to_market: market(token_byte.wrapping_add(0x40), token, 900),
            buy_from_market: market(token_byte.wrapping_add(0x80), token, 1000),
        }
    }

    fn success() -> SimulationResult {
        SimulationResult::Success {
            coinbase_diff: ether_div(200),
            total_gas_used: 200_000,
        }
    }

    fn block() -> BlockContext {
        BlockContext::new(1000, Some(GWEI * U256::from(30)))
    }

    fn pipeline(relay: FakeRelay, estimator: FakeEstimator) -> SubmissionPipeline<FakeRelay, FakeEstimator> {
        let config = ExecutionConfig::default();
        let builder = BundleBuilder::new(1, weth(), Address::repeat_byte(0xbe), Address::repeat_byte(0x5e), config.clone());
        SubmissionPipeline::new(relay, estimator, builder, config)
    }

    #[test]
    fn test_gas_limit_policy() {
        let config = ExecutionConfig::default();
        assert_eq!(settlement_gas_limit(&Ok(150_000), &config), Ok(300_000));
        assert_eq!(settlement_gas_limit(&Ok(1_400_000), &config), Ok(2_800_000));
        assert_eq!(
            settlement_gas_limit(&Ok(1_400_001), &config),
            Err(RejectReason::SuspiciousGasEstimate(1_400_001))
        );
        assert_eq!(settlement_gas_limit(&Err(anyhow::anyhow!("reverted")), &config), Ok(80_000));
    }

    #[tokio::test]
    async fn test_happy_path_submits_for_two_blocks() {
        let pipeline = pipeline(
            FakeRelay::with_simulations(vec![success()]),
            FakeEstimator::with_estimates(vec![Ok(150_000)]),
        );

        let receipt = pipeline.take_crossed_markets(&[candidate(1)], &block()).await.unwrap();

        assert_eq!(receipt.token, Address::repeat_byte(1));
        assert_eq!(receipt.gas_limit, 300_000);
        assert_eq!(receipt.attempted, 1);
        assert!(receipt.rejections.is_empty());

        let mut targets: Vec<u64> = receipt.submissions.iter().map(|s| s.target_block).collect();
        targets.sort();
        assert_eq!(targets, vec![1001, 1002]);

        let calls = pipeline.relay.calls();
        assert_eq!(&calls[..2], &[RelayCall::Sign(2), RelayCall::Simulate(1001)]);
        assert_eq!(calls.len(), 4);
    }

    #[tokio::test]
    async fn test_suspicious_estimate_skips_to_next_candidate() {
        let pipeline = pipeline(
            FakeRelay::with_simulations(vec![success()]),
            FakeEstimator::with_estimates(vec![Ok(2_000_000), Ok(100_000)]),
        );

        let receipt = pipeline
            .take_crossed_markets(&[candidate(1), candidate(2)], &block())
            .await
            .unwrap();

        assert_eq!(receipt.token, Address::repeat_byte(2));
        assert_eq!(receipt.attempted, 2);
        assert_eq!(
            receipt.rejections,
            vec![(Address::repeat_byte(1), RejectReason::SuspiciousGasEstimate(2_000_000))]
        );
        // the first candidate never reached the relay
        let calls = pipeline.relay.calls();
        assert_eq!(calls.iter().filter(|c| matches!(c, RelayCall::Sign(_))).count(), 1);
        assert_eq!(calls.iter().filter(|c| matches!(c, RelayCall::Simulate(_))).count(), 1);
        assert_eq!(pipeline.estimator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_suspicious_estimate_on_last_candidate_exhausts() {
        let pipeline = pipeline(
            FakeRelay::default(),
            FakeEstimator::with_estimates(vec![Ok(1_400_001)]),
        );

        let err = pipeline.take_crossed_markets(&[candidate(1)], &block()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NoArbitrageSubmitted { attempted: 1 }));
        assert!(pipeline.relay.calls().is_empty());
    }

    #[tokio::test]
    async fn test_revert_advances_then_exhausts() {
        let pipeline = pipeline(
            FakeRelay::with_simulations(vec![
                SimulationResult::Reverted { index: 0 },
                SimulationResult::Error("insufficient funds".into()),
            ]),
            FakeEstimator::with_estimates(vec![Ok(100_000), Ok(100_000)]),
        );

        let err = pipeline
            .take_crossed_markets(&[candidate(1), candidate(2)], &block())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::NoArbitrageSubmitted { attempted: 2 }));
        let calls = pipeline.relay.calls();
        assert_eq!(
            calls,
            vec![
                RelayCall::Sign(2),
                RelayCall::Simulate(1001),
                RelayCall::Sign(2),
                RelayCall::Simulate(1001),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_base_fee_aborts_before_any_call() {
        let pipeline = pipeline(
            FakeRelay::with_simulations(vec![success()]),
            FakeEstimator::with_estimates(vec![Ok(100_000)]),
        );
        let legacy = BlockContext::new(1000, None);

        let err = pipeline.take_crossed_markets(&[candidate(1)], &legacy).await.unwrap_err();

        assert!(matches!(err, ExecutionError::UnsupportedFeeMarket));
        assert_eq!(pipeline.estimator.call_count(), 0);
        assert!(pipeline.relay.calls().is_empty());
    }

    #[tokio::test]
    async fn test_estimate_failure_uses_fallback_limit() {
        let pipeline = pipeline(
            FakeRelay::with_simulations(vec![success()]),
            FakeEstimator::with_estimates(vec![Err(anyhow::anyhow!("execution reverted"))]),
        );

        let receipt = pipeline.take_crossed_markets(&[candidate(1)], &block()).await.unwrap();
        assert_eq!(receipt.gas_limit, 80_000);
        assert_eq!(receipt.submissions.len(), 2);
    }

    #[tokio::test]
    async fn test_submit_transport_error_propagates() {
        let relay = FakeRelay {
            fail_submit: true,
            ..FakeRelay::with_simulations(vec![success(), success()])
        };
        let pipeline = pipeline(relay, FakeEstimator::with_estimates(vec![Ok(100_000), Ok(100_000)]));

        let err = pipeline
            .take_crossed_markets(&[candidate(1), candidate(2)], &block())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Relay(RelayError::Transport(_))));
        // no fallback to the second candidate
        assert_eq!(pipeline.estimator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_candidate_list_exhausts() {
        let pipeline = pipeline(FakeRelay::default(), FakeEstimator::default());
        let err = pipeline.take_crossed_markets(&[], &block()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NoArbitrageSubmitted { attempted: 0 }));
    }
}
