//! Core type definitions

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One ether (or one unit of any 18-decimal asset) in wei
pub const ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// One gwei in wei
pub const GWEI: U256 = U256::from_limbs([1_000_000_000, 0, 0, 0]);

/// `ETHER / divisor`, the form every volume and threshold constant is written in
pub fn ether_div(divisor: u64) -> U256 {
    ETHER / U256::from(divisor)
}

/// `ETHER * multiple`
pub fn ether_mul(multiple: u64) -> U256 {
    ETHER * U256::from(multiple)
}

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Ethereum,
    Goerli,
}

impl ChainId {
    pub fn chain_id(&self) -> u64 {
        match self {
            ChainId::Ethereum => 1,
            ChainId::Goerli => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Goerli => "goerli",
        }
    }

    /// Default Flashbots relay endpoint for the network
    pub fn flashbots_relay(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "https://relay.flashbots.net",
            ChainId::Goerli => "https://relay-goerli.flashbots.net",
        }
    }

    pub fn from_testnet_flag(use_testnet: bool) -> Self {
        if use_testnet {
            ChainId::Goerli
        } else {
            ChainId::Ethereum
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// AMM protocols whose pairs share the Uniswap V2 interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DexProtocol {
    UniswapV2,
    SushiSwap,
    CroDefiSwap,
    Zeus,
    LuaSwap,
}

impl DexProtocol {
    pub fn name(&self) -> &'static str {
        match self {
            DexProtocol::UniswapV2 => "uniswap-v2",
            DexProtocol::SushiSwap => "sushiswap",
            DexProtocol::CroDefiSwap => "crodefiswap",
            DexProtocol::Zeus => "zeus",
            DexProtocol::LuaSwap => "luaswap",
        }
    }
}

impl fmt::Display for DexProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The slice of a block header the pipeline needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub number: u64,
    /// `None` on chains without an EIP-1559 fee market
    pub base_fee_per_gas: Option<U256>,
}

impl BlockContext {
    pub fn new(number: u64, base_fee_per_gas: Option<U256>) -> Self {
        Self { number, base_fee_per_gas }
    }
}

/// Render a raw amount as a decimal with four places, truncating the rest.
///
/// Amounts too large for 96 bits of mantissa are clamped; this is only used for log lines.
pub fn format_units(value: U256, decimals: u32) -> Decimal {
    let scaled = value * U256::from(10_000u64) / U256::from(10u64).pow(U256::from(decimals));
    let mantissa: i64 = scaled.try_into().unwrap_or(i64::MAX);
    Decimal::new(mantissa, 4)
}

/// `format_units` for 18-decimal amounts
pub fn format_ether(value: U256) -> Decimal {
    format_units(value, 18)
}
