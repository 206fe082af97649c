//! Market abstraction and constant-product pricing

use alloy_primitives::{Address, Bytes, U256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{CoreResult, DexProtocol, MultipleCallData};

/// Fee numerator shared by Uniswap V2 forks (0.3% fee)
pub const FEE_NUMERATOR: u64 = 997;
pub const FEE_DENOMINATOR: u64 = 1000;

/// An on-chain liquidity venue trading two assets.
///
/// Quote functions are pure given the market's current reserves. Reserve
/// refresh happens outside the trading core.
pub trait Market: Send + Sync + fmt::Debug {
    fn protocol(&self) -> DexProtocol;

    fn address(&self) -> Address;

    /// The two assets this market trades
    fn tokens(&self) -> [Address; 2];

    /// Output received for selling `amount_in` of `token_in`
    fn get_tokens_out(&self, token_in: Address, token_out: Address, amount_in: U256) -> CoreResult<U256>;

    /// Input of `token_in` required to receive `amount_out` of `token_out`
    fn get_tokens_in(&self, token_in: Address, token_out: Address, amount_out: U256) -> CoreResult<U256>;

    /// Whether a swap into this market can be paid by transferring `token` to it first
    fn receive_directly(&self, token: Address) -> bool;

    /// Calls that sell `amount_in` of `token_in` here and forward the output
    /// straight into `next` instead of back to the caller.
    fn sell_tokens_to_next_market(
        &self,
        token_in: Address,
        amount_in: U256,
        next: &dyn Market,
    ) -> CoreResult<MultipleCallData>;

    /// Payload selling `amount_in` of `token_in` with proceeds sent to `recipient`
    fn sell_tokens(&self, token_in: Address, amount_in: U256, recipient: Address) -> CoreResult<Bytes>;
}

/// Markets keyed by the non-base asset they trade against the base asset.
///
/// A `BTreeMap` keeps evaluation order independent of insertion order.
pub type MarketsByToken = BTreeMap<Address, Vec<Arc<dyn Market>>>;

/// Uniswap V2 output formula
/// amountOut = (amountIn * 997 * reserveOut) / (reserveIn * 1000 + amountIn * 997)
pub fn get_amount_out(reserve_in: U256, reserve_out: U256, amount_in: U256) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }

    let amount_in_with_fee = amount_in * U256::from(FEE_NUMERATOR);
    let numerator = amount_in_with_fee * reserve_out;
    let denominator = reserve_in * U256::from(FEE_DENOMINATOR) + amount_in_with_fee;

    numerator / denominator
}

/// Uniswap V2 input formula, rounded up by one wei.
///
/// Returns `U256::MAX` when the requested output drains the pool.
pub fn get_amount_in(reserve_in: U256, reserve_out: U256, amount_out: U256) -> U256 {
    if amount_out.is_zero() {
        return U256::ZERO;
    }

    if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
        return U256::MAX;
    }

    let numerator = reserve_in * amount_out * U256::from(FEE_DENOMINATOR);
    let denominator = (reserve_out - amount_out) * U256::from(FEE_NUMERATOR);

    numerator / denominator + U256::from(1)
}
