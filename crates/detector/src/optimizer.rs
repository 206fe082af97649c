//! Trade-size search for crossed pairs

use alloy_primitives::{Address, I256, U256};
use std::sync::Arc;
use tracing::debug;

use crossarb_core::{signed_profit, CoreResult, CrossedMarket};

use crate::strategies::CrossedPair;

/// Strategy for choosing a trade size on a crossed pair
pub trait VolumeSearch: Send + Sync {
    fn name(&self) -> &'static str;

    /// Best opportunity found for the pair, `None` if nothing is profitable
    fn search(&self, pair: &CrossedPair, token: Address, base_token: Address) -> Option<CrossedMarket>;
}

/// Profit from spending `volume` of the base asset in the buy market and
/// selling everything received into the sell market
pub fn profit_at(pair: &CrossedPair, token: Address, base_token: Address, volume: U256) -> CoreResult<I256> {
    let tokens_bought = pair
        .buy_from_market
        .get_tokens_out(base_token, token, volume)?;
    let proceeds = pair
        .sell_to_market
        .get_tokens_out(token, base_token, tokens_bought)?;
    Ok(signed_profit(proceeds, volume))
}

/// One-shot hill climb over an ascending volume ladder.
///
/// Walks the ladder until a rung makes less than the best so far, then tries
/// the midpoint between that rung and the best volume once and stops. This
/// assumes profit rises then falls across the ladder; a second peak further
/// up is never found.
#[derive(Debug, Clone)]
pub struct LadderSearch {
    test_volumes: Vec<U256>,
}

impl LadderSearch {
    pub fn new(test_volumes: Vec<U256>) -> Self {
        Self { test_volumes }
    }

    pub fn test_volumes(&self) -> &[U256] {
        &self.test_volumes
    }

    fn climb(&self, pair: &CrossedPair, token: Address, base_token: Address) -> CoreResult<Option<(U256, I256)>> {
        let mut best: Option<(U256, I256)> = None;

        for &size in &self.test_volumes {
            let profit = profit_at(pair, token, base_token, size)?;

            if let Some((best_volume, best_profit)) = best {
                if profit < best_profit {
                    // the next size up lost value, meet halfway
                    let try_size = (size + best_volume) / U256::from(2);
                    let try_profit = profit_at(pair, token, base_token, try_size)?;
                    if try_profit > best_profit {
                        best = Some((try_size, try_profit));
                    }
                    break;
                }
            }
            best = Some((size, profit));
        }

        Ok(best)
    }
}

impl VolumeSearch for LadderSearch {
    fn name(&self) -> &'static str {
        "ladder"
    }

    fn search(&self, pair: &CrossedPair, token: Address, base_token: Address) -> Option<CrossedMarket> {
        let (volume, profit) = match self.climb(pair, token, base_token) {
            Ok(Some(best)) => best,
            Ok(None) => return None,
            Err(e) => {
                debug!(
                    "Volume search failed for {} -> {}: {}",
                    pair.buy_from_market.address(),
                    pair.sell_to_market.address(),
                    e
                );
                return None;
            }
        };

        if !profit.is_positive() {
            return None;
        }

        Some(CrossedMarket {
            profit,
            volume,
            token,
            sell_to_market: Arc::clone(&pair.sell_to_market),
            buy_from_market: Arc::clone(&pair.buy_from_market),
        })
    }
}
