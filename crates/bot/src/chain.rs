//! JSON-RPC access to the chain

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionBuilder;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::BoxTransport;
use alloy_primitives::{Address, Bytes, U256};
use anyhow::Context;
use async_trait::async_trait;

use crossarb_core::BlockContext;
use crossarb_executor::{BuiltTransaction, GasEstimator};
use crossarb_markets::ContractCaller;

/// Source of the next nonce for an account
#[async_trait]
pub trait NonceSource: Send + Sync {
    async fn next_nonce(&self, account: Address) -> anyhow::Result<u64>;
}

/// Block numbers and headers
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_number(&self) -> anyhow::Result<u64>;

    /// Number and base fee of a block
    async fn block_context(&self, number: u64) -> anyhow::Result<BlockContext>;
}

/// `eth_estimateGas` request for a transaction sent by `from`
pub fn estimate_request(transaction: &BuiltTransaction, from: Address) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(from)
        .with_to(transaction.to)
        .with_value(transaction.value)
        .with_input(transaction.data.clone())
        .with_max_fee_per_gas(transaction.max_fee_per_gas.saturating_to::<u128>())
        .with_max_priority_fee_per_gas(transaction.max_priority_fee.saturating_to::<u128>())
}

/// Thin client over an alloy provider
#[derive(Clone)]
pub struct ChainClient {
    provider: RootProvider<BoxTransport>,
}

impl ChainClient {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let provider = ProviderBuilder::new()
            .on_builtin(url)
            .await
            .context("connecting to the RPC node")?;
        Ok(Self { provider })
    }

    pub fn provider(&self) -> &RootProvider<BoxTransport> {
        &self.provider
    }
}

#[async_trait]
impl BlockSource for ChainClient {
    async fn block_number(&self) -> anyhow::Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_context(&self, number: u64) -> anyhow::Result<BlockContext> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number), false)
            .await?
            .with_context(|| format!("block {} not found", number))?;
        let base_fee = block.header.base_fee_per_gas.map(U256::from);
        Ok(BlockContext::new(number, base_fee))
    }
}

#[async_trait]
impl ContractCaller for ChainClient {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        ContractCaller::call(&self.provider, to, data).await
    }
}

#[async_trait]
impl GasEstimator for ChainClient {
    async fn estimate_gas(&self, transaction: &BuiltTransaction, from: Address) -> anyhow::Result<u64> {
        let gas = self.provider.estimate_gas(&estimate_request(transaction, from)).await?;
        let gas: u64 = gas.try_into().context("gas estimate overflows u64")?;
        Ok(gas)
    }
}

#[async_trait]
impl NonceSource for ChainClient {
    async fn next_nonce(&self, account: Address) -> anyhow::Result<u64> {
        Ok(self.provider.get_transaction_count(account).await?)
    }
}

/// Tracks the highest block seen so each block is handled once
#[derive(Debug, Default)]
pub struct BlockPoller {
    last_seen: Option<u64>,
}

impl BlockPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the block number when it is newer than anything seen before
    pub fn observe(&mut self, number: u64) -> Option<u64> {
        match self.last_seen {
            Some(last) if number <= last => None,
            _ => {
                self.last_seen = Some(number);
                Some(number)
            }
        }
    }

    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}
