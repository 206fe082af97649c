//! Collaborators the submission pipeline talks to

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crossarb_core::{ExecutionResult, RelayError};

use crate::builder::BuiltTransaction;
use crate::simulator::SimulationResult;

/// Raw signed transactions in bundle order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBundle {
    pub transactions: Vec<Bytes>,
}

impl SignedBundle {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Relay acknowledgement of a bundle targeted at one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSubmission {
    pub target_block: u64,
    pub bundle_hash: Option<B256>,
}

/// Private bundle relay
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// Sign transactions in order with consecutive nonces
    async fn sign_bundle(&self, transactions: &[BuiltTransaction]) -> ExecutionResult<SignedBundle>;

    async fn simulate(&self, bundle: &SignedBundle, target_block: u64) -> Result<SimulationResult, RelayError>;

    async fn submit(&self, bundle: &SignedBundle, target_block: u64) -> Result<BundleSubmission, RelayError>;
}

/// Gas estimation for an unsigned transaction
#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn estimate_gas(&self, transaction: &BuiltTransaction, from: Address) -> anyhow::Result<u64>;
}
