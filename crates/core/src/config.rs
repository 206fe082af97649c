//! Configuration types

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{ether_div, ether_mul, CoreError, CoreResult, DexProtocol, FACTORY_ADDRESSES, GWEI, UNISWAP_QUERY_ADDRESS};

/// Crossed-market evaluation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Base-asset amount used to probe each market's buy and sell price
    pub probe_volume: U256,
    /// Ascending trade sizes tried by the volume search
    pub test_volumes: Vec<U256>,
    /// Opportunities must make strictly more than this
    pub min_profit: U256,
    /// Evaluate tokens on the rayon pool
    pub parallel: bool,
}

impl EvaluationConfig {
    /// The default ladder: 1/100, 1/10, 1/6, 1/4, 1/2, 1, 2, 5 and 10 ETH
    pub fn default_test_volumes() -> Vec<U256> {
        vec![
            ether_div(100),
            ether_div(10),
            ether_div(6),
            ether_div(4),
            ether_div(2),
            ether_div(1),
            ether_mul(2),
            ether_mul(5),
            ether_mul(10),
        ]
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.test_volumes.is_empty() {
            return Err(CoreError::InvalidConfig("test volume ladder is empty".into()));
        }
        if self.test_volumes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::InvalidConfig("test volumes must be strictly ascending".into()));
        }
        if self.probe_volume.is_zero() {
            return Err(CoreError::InvalidConfig("probe volume must be positive".into()));
        }
        Ok(())
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            probe_volume: ether_div(100),
            test_volumes: Self::default_test_volumes(),
            min_profit: ether_div(1000),
            parallel: true,
        }
    }
}

/// Bundle construction and submission parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub priority_fee: U256,
    /// How many blocks ahead the max fee must stay valid for
    pub blocks_in_future: u64,
    /// Gas estimates above this are treated as suspicious
    pub max_gas_estimate: u64,
    /// Gas limit used when estimation fails
    pub fallback_gas_limit: u64,
    pub gas_limit_multiplier: u64,
    pub decoy_gas_limit: u64,
    /// Percentage of profit paid to the block proposer (0-100)
    pub miner_reward_percentage: u8,
}

impl ExecutionConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.miner_reward_percentage > 100 {
            return Err(CoreError::InvalidConfig(format!(
                "miner reward percentage {} exceeds 100",
                self.miner_reward_percentage
            )));
        }
        if self.gas_limit_multiplier == 0 {
            return Err(CoreError::InvalidConfig("gas limit multiplier must be positive".into()));
        }
        Ok(())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            priority_fee: GWEI * U256::from(3),
            blocks_in_future: 2,
            max_gas_estimate: 1_400_000,
            fallback_gas_limit: 80_000,
            gas_limit_multiplier: 2,
            decoy_gas_limit: 21_000,
            miner_reward_percentage: 80,
        }
    }
}

/// A factory to scan for pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub protocol: DexProtocol,
    pub address: Address,
}

/// Market discovery and reserve refresh parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub factories: Vec<FactoryConfig>,
    pub flash_query: Address,
    /// Pairs requested per `getPairsByIndexRange` / `getReservesByPairs` call
    pub batch_size: usize,
    pub max_pairs_per_factory: usize,
    /// Markets holding less WETH than this are left out of the snapshot
    pub min_weth_liquidity: U256,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            factories: FACTORY_ADDRESSES
                .iter()
                .map(|(protocol, address)| FactoryConfig {
                    protocol: *protocol,
                    address: *address,
                })
                .collect(),
            flash_query: UNISWAP_QUERY_ADDRESS,
            batch_size: 1000,
            max_pairs_per_factory: 10_000,
            min_weth_liquidity: ether_mul(1),
        }
    }
}
