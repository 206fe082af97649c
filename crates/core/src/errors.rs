//! Error types

use alloy_primitives::Address;
use thiserror::Error;

/// Core error types
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Token {token} is not traded by market {market}")]
    TokenNotInMarket { token: Address, market: Address },

    #[error("Market {market} cannot receive {token} directly")]
    NoDirectRoute { token: Address, market: Address },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Relay transport and protocol errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relay transport failed: {0}")]
    Transport(String),

    #[error("Relay returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid relay response: {0}")]
    InvalidResponse(String),
}

/// Execution errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Chain is not EIP-1559 enabled")]
    UnsupportedFeeMarket,

    #[error("No arbitrage submitted to relay ({attempted} candidates rejected)")]
    NoArbitrageSubmitted { attempted: usize },

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("Bundle signing failed: {0}")]
    Signing(String),

    #[error("Bundle encoding failed: {0}")]
    Encoding(#[from] CoreError),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type ExecutionResult<T> = Result<T, ExecutionError>;
