//! Crossed-market opportunity types

use alloy_primitives::{Address, I256, U256};
use std::fmt;
use std::sync::Arc;

use crate::{format_ether, Market};

/// A pair of markets for one token where buying in one and selling in the
/// other returns more base asset than was spent.
///
/// `profit` is what selling the tokens bought with `volume` in
/// `buy_from_market` returns from `sell_to_market`, minus `volume`.
#[derive(Debug, Clone)]
pub struct CrossedMarket {
    pub profit: I256,
    pub volume: U256,
    pub token: Address,
    pub sell_to_market: Arc<dyn Market>,
    pub buy_from_market: Arc<dyn Market>,
}

impl CrossedMarket {
    /// Profit as an unsigned amount, zero when not positive
    pub fn profit_wei(&self) -> U256 {
        if self.profit.is_positive() {
            self.profit.into_raw()
        } else {
            U256::ZERO
        }
    }

    /// Share of the profit paid to the block proposer
    pub fn miner_reward(&self, percentage: u8) -> U256 {
        self.profit_wei() * U256::from(percentage) / U256::from(100u64)
    }
}

impl fmt::Display for CrossedMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buy_tokens = self.buy_from_market.tokens();
        let sell_tokens = self.sell_to_market.tokens();
        let sign = if self.profit.is_negative() { "-" } else { "" };
        write!(
            f,
            "Profit: {}{} Volume: {} | {} ({}) {} => {} | {} ({}) {} => {}",
            sign,
            format_ether(self.profit.unsigned_abs()),
            format_ether(self.volume),
            self.buy_from_market.protocol(),
            self.buy_from_market.address(),
            buy_tokens[0],
            buy_tokens[1],
            self.sell_to_market.protocol(),
            self.sell_to_market.address(),
            sell_tokens[0],
            sell_tokens[1],
        )
    }
}

/// Signed difference of two amounts
pub fn signed_profit(proceeds: U256, cost: U256) -> I256 {
    I256::from_raw(proceeds).saturating_sub(I256::from_raw(cost))
}
