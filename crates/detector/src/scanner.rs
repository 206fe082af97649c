//! Snapshot evaluation
//!
//! Turns a `MarketsByToken` snapshot into a ranked list of crossed markets,
//! keeping at most one opportunity per token.

use alloy_primitives::Address;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crossarb_core::{CrossedMarket, EvaluationConfig, Market, MarketsByToken};

use crate::optimizer::{LadderSearch, VolumeSearch};
use crate::strategies::CrossedPairDetector;

/// Finds and ranks profitable crossed markets
pub struct ArbitrageEvaluator {
    config: EvaluationConfig,
    base_token: Address,
    detector: CrossedPairDetector,
    search: Box<dyn VolumeSearch>,
}

impl ArbitrageEvaluator {
    pub fn new(config: EvaluationConfig, base_token: Address) -> Self {
        let search = Box::new(LadderSearch::new(config.test_volumes.clone()));
        Self::with_search(config, base_token, search)
    }

    pub fn with_search(config: EvaluationConfig, base_token: Address, search: Box<dyn VolumeSearch>) -> Self {
        let detector = CrossedPairDetector::new(base_token, config.probe_volume);
        Self {
            config,
            base_token,
            detector,
            search,
        }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn base_token(&self) -> Address {
        self.base_token
    }

    /// Best opportunity per token, filtered by the minimum profit and sorted
    /// by descending profit. Ties keep snapshot order.
    pub fn evaluate_markets(&self, markets_by_token: &MarketsByToken) -> Vec<CrossedMarket> {
        let start = Instant::now();

        let mut opportunities: Vec<CrossedMarket> = if self.config.parallel {
            markets_by_token
                .par_iter()
                .filter_map(|(token, markets)| self.best_for_token(*token, markets))
                .collect()
        } else {
            markets_by_token
                .iter()
                .filter_map(|(token, markets)| self.best_for_token(*token, markets))
                .collect()
        };

        opportunities.sort_by(|a, b| b.profit.cmp(&a.profit));

        debug!(
            "Evaluated {} tokens with {} search, {} opportunities in {:?}",
            markets_by_token.len(),
            self.search.name(),
            opportunities.len(),
            start.elapsed()
        );

        opportunities
    }

    fn best_for_token(&self, token: Address, markets: &[Arc<dyn Market>]) -> Option<CrossedMarket> {
        let mut best: Option<CrossedMarket> = None;

        for pair in self.detector.find_crossed_pairs(token, markets) {
            let Some(candidate) = self.search.search(&pair, token, self.base_token) else {
                continue;
            };
            let better = best
                .as_ref()
                .map(|current| candidate.profit > current.profit)
                .unwrap_or(true);
            if better {
                best = Some(candidate);
            }
        }

        best.filter(|opportunity| {
            opportunity.profit.is_positive() && opportunity.profit.into_raw() > self.config.min_profit
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use crossarb_core::{ether_mul, DexProtocol};
    use crossarb_markets::UniswapV2Pair;

    fn weth() -> Address {
        Address::repeat_byte(0xee)
    }

    fn token(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn market(byte: u8, token: Address, weth_reserve: u64, token_reserve: u64) -> Arc<dyn Market> {
        Arc::new(
            UniswapV2Pair::new(Address::repeat_byte(byte), [token, weth()], DexProtocol::UniswapV2)
                .with_reserves(ether_mul(token_reserve), ether_mul(weth_reserve)),
        )
    }

    fn evaluator(min_profit: U256, parallel: bool) -> ArbitrageEvaluator {
        let config = EvaluationConfig {
            min_profit,
            parallel,
            ..Default::default()
        };
        ArbitrageEvaluator::new(config, weth())
    }

    fn crossed_snapshot() -> MarketsByToken {
        let mut snapshot = MarketsByToken::new();
        snapshot.insert(
            token(1),
            vec![market(0x10, token(1), 10, 1000), market(0x11, token(1), 10, 900)],
        );
        snapshot
    }

    #[test]
    fn test_crossed_pools_yield_one_opportunity() {
        let found = evaluator(EvaluationConfig::default().min_profit, false).evaluate_markets(&crossed_snapshot());

        assert_eq!(found.len(), 1);
        let opportunity = &found[0];
        assert_eq!(opportunity.token, token(1));
        assert_eq!(opportunity.buy_from_market.address(), Address::repeat_byte(0x10));
        assert_eq!(opportunity.sell_to_market.address(), Address::repeat_byte(0x11));
        assert!(opportunity.profit.is_positive());
    }

    #[test]
    fn test_identical_pools_yield_nothing() {
        let mut snapshot = MarketsByToken::new();
        snapshot.insert(
            token(1),
            vec![market(0x10, token(1), 10, 1000), market(0x11, token(1), 10, 1000)],
        );
        assert!(evaluator(U256::ZERO, false).evaluate_markets(&snapshot).is_empty());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let evaluator = evaluator(U256::ZERO, true);
        let snapshot = crossed_snapshot();

        let first = evaluator.evaluate_markets(&snapshot);
        let second = evaluator.evaluate_markets(&snapshot);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.profit, b.profit);
            assert_eq!(a.volume, b.volume);
            assert_eq!(a.token, b.token);
        }
    }

    #[test]
    fn test_min_profit_is_strict() {
        let snapshot = crossed_snapshot();
        let found = evaluator(U256::ZERO, false).evaluate_markets(&snapshot);
        let profit = found[0].profit.into_raw();

        assert!(evaluator(profit, false).evaluate_markets(&snapshot).is_empty());
        assert_eq!(evaluator(profit - U256::from(1), false).evaluate_markets(&snapshot).len(), 1);
    }

    #[test]
    fn test_sorted_by_profit_one_per_token() {
        let mut snapshot = crossed_snapshot();
        // wider gap on token 2
        snapshot.insert(
            token(2),
            vec![
                market(0x20, token(2), 10, 1000),
                market(0x21, token(2), 10, 700),
                market(0x22, token(2), 10, 800),
            ],
        );

        let found = evaluator(U256::ZERO, true).evaluate_markets(&snapshot);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].token, token(2));
        assert_eq!(found[1].token, token(1));
        assert!(found[0].profit >= found[1].profit);
        // cheapest market against the dearest one
        assert_eq!(found[0].buy_from_market.address(), Address::repeat_byte(0x20));
        assert_eq!(found[0].sell_to_market.address(), Address::repeat_byte(0x21));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let snapshot = crossed_snapshot();
        let sequential = evaluator(U256::ZERO, false).evaluate_markets(&snapshot);
        let parallel = evaluator(U256::ZERO, true).evaluate_markets(&snapshot);
        assert_eq!(sequential.len(), parallel.len());
        assert_eq!(sequential[0].profit, parallel[0].profit);
    }

    #[test]
    fn test_equal_profit_keeps_first_pair() {
        let mut snapshot = MarketsByToken::new();
        // 0x10 and 0x12 are interchangeable buy sides against 0x11
        snapshot.insert(
            token(1),
            vec![
                market(0x10, token(1), 10, 1000),
                market(0x11, token(1), 10, 900),
                market(0x12, token(1), 10, 1000),
            ],
        );

        for parallel in [false, true] {
            let found = evaluator(U256::ZERO, parallel).evaluate_markets(&snapshot);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].buy_from_market.address(), Address::repeat_byte(0x10));
            assert_eq!(found[0].sell_to_market.address(), Address::repeat_byte(0x11));
        }
    }
}
