//! Bundle simulation results
//!
//! Classifies `eth_callBundle` responses into success, first revert or error.

use alloy_primitives::{B256, U256};
use serde::Deserialize;

use crossarb_core::RelayError;

/// Outcome of simulating a bundle against a future block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationResult {
    Success { coinbase_diff: U256, total_gas_used: u64 },
    /// Index of the first transaction that reverted
    Reverted { index: usize },
    Error(String),
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResult::Success { .. })
    }

    /// Coinbase payment per unit of gas, zero when nothing ran
    pub fn effective_gas_price(&self) -> Option<U256> {
        match self {
            SimulationResult::Success {
                coinbase_diff,
                total_gas_used,
            } if *total_gas_used > 0 => Some(*coinbase_diff / U256::from(*total_gas_used)),
            SimulationResult::Success { .. } => Some(U256::ZERO),
            _ => None,
        }
    }

    /// Classify the `result` field of an `eth_callBundle` response
    pub fn from_call_bundle(response: CallBundleResponse) -> Result<Self, RelayError> {
        if let Some(index) = response.first_revert() {
            return Ok(SimulationResult::Reverted { index });
        }

        let coinbase_diff = parse_amount(&response.coinbase_diff)?;
        Ok(SimulationResult::Success {
            coinbase_diff,
            total_gas_used: response.total_gas_used,
        })
    }
}

/// `eth_callBundle` result body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBundleResponse {
    #[serde(default)]
    pub bundle_hash: Option<B256>,
    pub coinbase_diff: String,
    pub total_gas_used: u64,
    #[serde(default)]
    pub results: Vec<CallBundleTxResult>,
}

impl CallBundleResponse {
    pub fn first_revert(&self) -> Option<usize> {
        self.results
            .iter()
            .position(|r| r.error.is_some() || r.revert.is_some())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBundleTxResult {
    #[serde(default)]
    pub tx_hash: Option<B256>,
    #[serde(default)]
    pub gas_used: u64,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub revert: Option<String>,
}

/// Relays report wei amounts as decimal strings, sometimes as hex
fn parse_amount(raw: &str) -> Result<U256, RelayError> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(raw, 10),
    };
    parsed.map_err(|e| RelayError::InvalidResponse(format!("bad amount {raw:?}: {e}")))
}
