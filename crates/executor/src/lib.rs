//! Bundle construction and submission
//!
//! Features:
//! - EIP-1559 fee caps valid for the next few blocks
//! - Settlement and decoy transactions for the bundle executor contract
//! - Relay simulation result classification
//! - Ranked-candidate submission pipeline

pub mod fees;
pub mod builder;
pub mod relay;
pub mod simulator;
pub mod submitter;

pub use fees::{max_base_fee_in_future_block, FeeParams};
pub use builder::{ArbitrageBundle, BuiltTransaction, BundleBuilder, IBundleExecutor};
pub use relay::{BundleRelay, BundleSubmission, GasEstimator, SignedBundle};
pub use simulator::{CallBundleResponse, CallBundleTxResult, SimulationResult};
pub use submitter::{settlement_gas_limit, RejectReason, SubmissionPipeline, SubmissionReceipt, SUBMISSION_BLOCKS};
