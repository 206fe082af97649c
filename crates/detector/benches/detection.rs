//! Snapshot evaluation throughput
//!
//! Builds a synthetic snapshot where every token trades on a handful of
//! pools with slightly different prices.

use alloy_primitives::{Address, U256};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use crossarb_core::{ether_mul, DexProtocol, EvaluationConfig, Market, MarketsByToken};
use crossarb_detector::ArbitrageEvaluator;
use crossarb_markets::UniswapV2Pair;

const MARKETS_PER_TOKEN: u64 = 4;

fn weth() -> Address {
    Address::repeat_byte(0xee)
}

fn snapshot(tokens: u64) -> MarketsByToken {
    let mut snapshot = MarketsByToken::new();
    for t in 0..tokens {
        let token = Address::left_padding_from(&(t + 1).to_be_bytes());
        let markets: Vec<Arc<dyn Market>> = (0..MARKETS_PER_TOKEN)
            .map(|m| {
                let address = Address::left_padding_from(&(0x1_0000 + t * MARKETS_PER_TOKEN + m).to_be_bytes());
                let token_reserve = ether_mul(1000 - 25 * m);
                Arc::new(
                    UniswapV2Pair::new(address, [token, weth()], DexProtocol::UniswapV2)
                        .with_reserves(token_reserve, ether_mul(10)),
                ) as Arc<dyn Market>
            })
            .collect();
        snapshot.insert(token, markets);
    }
    snapshot
}

fn bench_evaluate_markets(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_markets");

    for tokens in [10u64, 100, 500] {
        let snapshot = snapshot(tokens);

        for parallel in [false, true] {
            let config = EvaluationConfig {
                parallel,
                min_profit: U256::ZERO,
                ..Default::default()
            };
            let evaluator = ArbitrageEvaluator::new(config, weth());
            let label = if parallel { "parallel" } else { "sequential" };

            group.bench_with_input(BenchmarkId::new(label, tokens), &snapshot, |b, snapshot| {
                b.iter(|| black_box(evaluator.evaluate_markets(black_box(snapshot))));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate_markets);
criterion_main!(benches);
