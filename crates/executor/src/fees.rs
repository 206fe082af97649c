//! EIP-1559 fee parameters for bundle transactions

use alloy_primitives::U256;

use crossarb_core::{BlockContext, ExecutionConfig};

/// Highest base fee reachable `blocks_in_future` blocks from now.
///
/// The protocol lets the base fee grow by at most 12.5% per block.
pub fn max_base_fee_in_future_block(base_fee: U256, blocks_in_future: u64) -> U256 {
    let mut max_base_fee = base_fee;
    for _ in 0..blocks_in_future {
        max_base_fee = max_base_fee * U256::from(1125u64) / U256::from(1000u64) + U256::from(1u64);
    }
    max_base_fee
}

/// Fee caps shared by every transaction of a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParams {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl FeeParams {
    /// `None` when the block carries no base fee
    pub fn for_block(block: &BlockContext, config: &ExecutionConfig) -> Option<Self> {
        let base_fee = block.base_fee_per_gas?;
        let max_base_fee = max_base_fee_in_future_block(base_fee, config.blocks_in_future);
        Some(Self {
            max_fee_per_gas: config.priority_fee + max_base_fee,
            max_priority_fee_per_gas: config.priority_fee,
        })
    }
}
