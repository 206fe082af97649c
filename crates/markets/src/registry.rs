//! Concurrent market registry
//!
//! Uses DashMap so reserve refreshes and snapshot reads don't contend on one lock

use alloy_primitives::{Address, U256};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crossarb_core::{Market, MarketsByToken};

use crate::pair::UniswapV2Pair;

/// A registered pair and the non-base token it trades
#[derive(Debug, Clone)]
pub struct PairEntry {
    pub pair: Arc<UniswapV2Pair>,
    pub token: Address,
}

/// All known pairs that trade against the base asset
#[derive(Debug)]
pub struct MarketRegistry {
    base_token: Address,

    /// Pairs indexed by pair address
    pairs: DashMap<Address, PairEntry>,

    /// Block of the last reserve refresh
    block_number: AtomicU64,

    update_count: AtomicU64,
    last_update: RwLock<Instant>,
}

impl MarketRegistry {
    pub fn new(base_token: Address) -> Self {
        Self {
            base_token,
            pairs: DashMap::new(),
            block_number: AtomicU64::new(0),
            update_count: AtomicU64::new(0),
            last_update: RwLock::new(Instant::now()),
        }
    }

    pub fn base_token(&self) -> Address {
        self.base_token
    }

    /// Register a pair. Pairs that don't trade the base asset are ignored.
    pub fn insert(&self, pair: UniswapV2Pair) -> bool {
        let [token0, token1] = pair.tokens();
        let token = if token0 == self.base_token {
            token1
        } else if token1 == self.base_token {
            token0
        } else {
            debug!("Skipping pair {} without base token", pair.address());
            return false;
        };

        self.pairs.insert(
            pair.address(),
            PairEntry {
                pair: Arc::new(pair),
                token,
            },
        );
        true
    }

    pub fn get(&self, address: Address) -> Option<Arc<UniswapV2Pair>> {
        self.pairs.get(&address).map(|e| Arc::clone(&e.value().pair))
    }

    /// Addresses of every registered pair, sorted
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.pairs.iter().map(|e| *e.key()).collect();
        addresses.sort();
        addresses
    }

    /// Write fresh reserves into a pair. Returns false for unknown pairs.
    pub fn update_reserves(&self, address: Address, reserve0: U256, reserve1: U256) -> bool {
        match self.pairs.get(&address) {
            Some(entry) => {
                entry.value().pair.set_reserves(reserve0, reserve1);
                self.update_count.fetch_add(1, Ordering::Relaxed);
                *self.last_update.write() = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn set_block(&self, block: u64) {
        self.block_number.store(block, Ordering::Relaxed);
    }

    pub fn block(&self) -> u64 {
        self.block_number.load(Ordering::Relaxed)
    }

    /// Snapshot of markets grouped by token.
    ///
    /// Pairs holding less than `min_base_liquidity` of the base asset are left
    /// out, and tokens with fewer than two remaining markets are dropped.
    pub fn markets_by_token(&self, min_base_liquidity: U256) -> MarketsByToken {
        let mut grouped = MarketsByToken::new();

        for entry in self.pairs.iter() {
            let PairEntry { pair, token } = entry.value();
            let liquid = pair
                .balance(self.base_token)
                .map(|b| b > min_base_liquidity)
                .unwrap_or(false);
            if !liquid {
                continue;
            }
            grouped
                .entry(*token)
                .or_default()
                .push(Arc::clone(pair) as Arc<dyn Market>);
        }

        grouped.retain(|_, markets| markets.len() > 1);
        for markets in grouped.values_mut() {
            markets.sort_by_key(|m| m.address());
        }
        grouped
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Stats
    pub fn stats(&self) -> RegistryStats {
        let mut tokens: Vec<Address> = self.pairs.iter().map(|e| e.value().token).collect();
        tokens.sort();
        tokens.dedup();

        RegistryStats {
            pair_count: self.pairs.len(),
            token_count: tokens.len(),
            update_count: self.update_count.load(Ordering::Relaxed),
            last_update_age: self.last_update.read().elapsed(),
        }
    }
}

/// Statistics about the registry
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub pair_count: usize,
    pub token_count: usize,
    pub update_count: u64,
    pub last_update_age: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossarb_core::{DexProtocol, ETHER};

    fn weth() -> Address {
        Address::repeat_byte(0xee)
    }

    fn pair(byte: u8, token: Address, weth_reserve: U256) -> UniswapV2Pair {
        UniswapV2Pair::new(Address::repeat_byte(byte), [token, weth()], DexProtocol::UniswapV2)
            .with_reserves(ETHER * U256::from(100), weth_reserve)
    }

    #[test]
    fn test_pairs_without_base_token_ignored() {
        let registry = MarketRegistry::new(weth());
        let foreign = UniswapV2Pair::new(
            Address::repeat_byte(9),
            [Address::repeat_byte(1), Address::repeat_byte(2)],
            DexProtocol::SushiSwap,
        );
        assert!(!registry.insert(foreign));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_groups_and_filters() {
        let registry = MarketRegistry::new(weth());
        let token_a = Address::repeat_byte(1);
        let token_b = Address::repeat_byte(2);

        registry.insert(pair(0x10, token_a, ETHER * U256::from(5)));
        registry.insert(pair(0x11, token_a, ETHER * U256::from(7)));
        // only one market for token_b
        registry.insert(pair(0x12, token_b, ETHER * U256::from(5)));
        // second token_b market is too thin
        registry.insert(pair(0x13, token_b, ETHER / U256::from(2)));

        let snapshot = registry.markets_by_token(ETHER);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&token_a].len(), 2);
        assert!(!snapshot.contains_key(&token_b));
    }

    #[test]
    fn test_update_reserves() {
        let registry = MarketRegistry::new(weth());
        let token = Address::repeat_byte(1);
        registry.insert(pair(0x10, token, U256::ZERO));

        assert!(registry.update_reserves(Address::repeat_byte(0x10), ETHER, ETHER * U256::from(3)));
        assert!(!registry.update_reserves(Address::repeat_byte(0x99), ETHER, ETHER));

        let stored = registry.get(Address::repeat_byte(0x10)).unwrap();
        assert_eq!(stored.reserves(), [ETHER, ETHER * U256::from(3)]);
        assert_eq!(registry.stats().update_count, 1);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let registry = Arc::new(MarketRegistry::new(weth()));
        registry.insert(pair(0x10, Address::repeat_byte(1), ETHER));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for j in 0..100u64 {
                        registry.update_reserves(
                            Address::repeat_byte(0x10),
                            U256::from(i * 100 + j),
                            ETHER,
                        );
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.stats().update_count, 400);
    }
}
