//! Crossed-pair detection
//!
//! Every market for a token is priced with a small probe of the base asset.
//! Two markets are crossed when the tokens one hands out for the probe exceed
//! the tokens the other needs to pay the probe back.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::debug;

use crossarb_core::Market;

/// A market with its probe-volume prices, both in token units
#[derive(Debug, Clone)]
pub struct PricedMarket {
    pub market: Arc<dyn Market>,
    /// Tokens that must be sold here to receive the probe volume of base asset
    pub buy_token_price: U256,
    /// Tokens received here for spending the probe volume of base asset
    pub sell_token_price: U256,
}

/// Candidate arbitrage: buy the token in `buy_from_market`, sell it in `sell_to_market`
#[derive(Debug, Clone)]
pub struct CrossedPair {
    pub sell_to_market: Arc<dyn Market>,
    pub buy_from_market: Arc<dyn Market>,
}

/// Finds crossed market pairs for a token
#[derive(Debug, Clone)]
pub struct CrossedPairDetector {
    base_token: Address,
    probe_volume: U256,
}

impl CrossedPairDetector {
    pub fn new(base_token: Address, probe_volume: U256) -> Self {
        Self {
            base_token,
            probe_volume,
        }
    }

    pub fn probe_volume(&self) -> U256 {
        self.probe_volume
    }

    /// Probe prices for each market. Markets that fail to quote are skipped.
    pub fn price_markets(&self, token: Address, markets: &[Arc<dyn Market>]) -> Vec<PricedMarket> {
        markets
            .iter()
            .filter_map(|market| {
                let buy = market.get_tokens_in(token, self.base_token, self.probe_volume);
                let sell = market.get_tokens_out(self.base_token, token, self.probe_volume);
                match (buy, sell) {
                    (Ok(buy_token_price), Ok(sell_token_price)) => Some(PricedMarket {
                        market: Arc::clone(market),
                        buy_token_price,
                        sell_token_price,
                    }),
                    (Err(e), _) | (_, Err(e)) => {
                        debug!("Skipping market {}: {}", market.address(), e);
                        None
                    }
                }
            })
            .collect()
    }

    /// All ordered crossed pairs for `token`. Tokens with fewer than two
    /// markets never produce candidates.
    pub fn find_crossed_pairs(&self, token: Address, markets: &[Arc<dyn Market>]) -> Vec<CrossedPair> {
        if markets.len() < 2 {
            return Vec::new();
        }

        let priced = self.price_markets(token, markets);
        let mut crossed = Vec::new();

        for (i, sell_side) in priced.iter().enumerate() {
            for (j, buy_side) in priced.iter().enumerate() {
                if i == j {
                    continue;
                }
                if buy_side.sell_token_price > sell_side.buy_token_price {
                    crossed.push(CrossedPair {
                        sell_to_market: Arc::clone(&sell_side.market),
                        buy_from_market: Arc::clone(&buy_side.market),
                    });
                }
            }
        }

        crossed
    }
}
