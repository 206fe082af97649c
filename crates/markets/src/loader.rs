//! Pair discovery and reserve refresh through the batch query contract

use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::BoxTransport;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crossarb_core::{FactoryConfig, LoaderConfig};

use crate::abi::UniswapFlashQuery;
use crate::pair::UniswapV2Pair;
use crate::registry::MarketRegistry;

/// Read-only contract calls against the latest block
#[async_trait]
pub trait ContractCaller: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes>;
}

#[async_trait]
impl ContractCaller for RootProvider<BoxTransport> {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        Ok(Provider::call(self, &request).await?)
    }
}

/// Discovers WETH pairs on each factory and keeps their reserves fresh
pub struct MarketLoader<C> {
    caller: C,
    config: LoaderConfig,
}

impl<C: ContractCaller> MarketLoader<C> {
    pub fn new(caller: C, config: LoaderConfig) -> Self {
        Self { caller, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Page through every configured factory and register pairs for tokens
    /// that trade on more than one market.
    pub async fn discover(&self, registry: &MarketRegistry) -> anyhow::Result<usize> {
        let base = registry.base_token();
        let mut by_token: HashMap<Address, Vec<UniswapV2Pair>> = HashMap::new();

        for factory in &self.config.factories {
            let pairs = self.fetch_factory_pairs(factory, base).await?;
            info!(
                "Loaded {} WETH pairs from {} factory {}",
                pairs.len(),
                factory.protocol,
                factory.address
            );
            for (token, pair) in pairs {
                by_token.entry(token).or_default().push(pair);
            }
        }

        let mut registered = 0;
        for (_, pairs) in by_token.into_iter().filter(|(_, p)| p.len() > 1) {
            for pair in pairs {
                if registry.insert(pair) {
                    registered += 1;
                }
            }
        }

        info!("Registered {} pairs across {} factories", registered, self.config.factories.len());
        Ok(registered)
    }

    async fn fetch_factory_pairs(
        &self,
        factory: &FactoryConfig,
        base: Address,
    ) -> anyhow::Result<Vec<(Address, UniswapV2Pair)>> {
        let batch = self.config.batch_size.max(1);
        let mut found = Vec::new();
        let mut start = 0usize;

        while start < self.config.max_pairs_per_factory {
            let call = UniswapFlashQuery::getPairsByIndexRangeCall {
                factory: factory.address,
                start: U256::from(start),
                stop: U256::from(start + batch),
            };
            let raw = self
                .caller
                .call(self.config.flash_query, Bytes::from(call.abi_encode()))
                .await?;
            let page = UniswapFlashQuery::getPairsByIndexRangeCall::abi_decode_returns(&raw, true)?._0;
            let page_len = page.len();

            for [token0, token1, pair_address] in page {
                let token = if token0 == base {
                    token1
                } else if token1 == base {
                    token0
                } else {
                    continue;
                };
                found.push((
                    token,
                    UniswapV2Pair::new(pair_address, [token0, token1], factory.protocol),
                ));
            }

            if page_len < batch {
                break;
            }
            start += batch;
        }

        Ok(found)
    }

    /// Refresh reserves for every registered pair
    pub async fn update_reserves(&self, registry: &MarketRegistry) -> anyhow::Result<usize> {
        let addresses = registry.addresses();
        let mut updated = 0;

        for chunk in addresses.chunks(self.config.batch_size.max(1)) {
            let call = UniswapFlashQuery::getReservesByPairsCall {
                pairs: chunk.to_vec(),
            };
            let raw = self
                .caller
                .call(self.config.flash_query, Bytes::from(call.abi_encode()))
                .await?;
            let reserves = UniswapFlashQuery::getReservesByPairsCall::abi_decode_returns(&raw, true)?._0;

            if reserves.len() != chunk.len() {
                warn!(
                    "Reserve batch returned {} entries for {} pairs",
                    reserves.len(),
                    chunk.len()
                );
            }

            for (address, [reserve0, reserve1, _]) in chunk.iter().zip(reserves) {
                if registry.update_reserves(*address, reserve0, reserve1) {
                    updated += 1;
                }
            }
        }

        debug!("Refreshed reserves for {} pairs", updated);
        Ok(updated)
    }
}
