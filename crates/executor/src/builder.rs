//! Bundle construction for crossed-market arbitrage

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crossarb_core::{CoreResult, CrossedMarket, ExecutionConfig, MultipleCallData};

use crate::fees::FeeParams;

sol! {
    interface IBundleExecutor {
        function uniswapWeth(
            uint256 _wethAmountToFirstMarket,
            uint256 _ethAmountToCoinbase,
            address[] _targets,
            bytes[] _payloads
        ) external payable;
    }
}

/// Unsigned EIP-1559 transaction, nonce filled in at signing time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub chain_id: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee: U256,
}

/// Settlement transaction plus the decoy that follows it in the bundle
#[derive(Debug, Clone)]
pub struct ArbitrageBundle {
    pub settlement: BuiltTransaction,
    pub decoy: BuiltTransaction,
    /// Swap calls replayed by the executor contract
    pub calls: MultipleCallData,
    pub miner_reward: U256,
}

impl ArbitrageBundle {
    pub fn set_settlement_gas_limit(&mut self, gas_limit: u64) {
        self.settlement.gas_limit = gas_limit;
    }

    /// Bundle order: settlement first, decoy second
    pub fn transactions(&self) -> Vec<BuiltTransaction> {
        vec![self.settlement.clone(), self.decoy.clone()]
    }
}

/// Builds bundles that settle through the on-chain bundle executor
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    chain_id: u64,
    base_token: Address,
    executor_contract: Address,
    searcher: Address,
    config: ExecutionConfig,
}

impl BundleBuilder {
    pub fn new(
        chain_id: u64,
        base_token: Address,
        executor_contract: Address,
        searcher: Address,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            chain_id,
            base_token,
            executor_contract,
            searcher,
            config,
        }
    }

    pub fn searcher(&self) -> Address {
        self.searcher
    }

    pub fn executor_contract(&self) -> Address {
        self.executor_contract
    }

    /// Buy the token with `volume` in the buy market, forwarding it straight
    /// to the sell market, then sell it there with proceeds going to the
    /// executor contract.
    pub fn encode_calls(&self, opportunity: &CrossedMarket) -> CoreResult<MultipleCallData> {
        let buy_from = &opportunity.buy_from_market;
        let sell_to = &opportunity.sell_to_market;

        let mut calls =
            buy_from.sell_tokens_to_next_market(self.base_token, opportunity.volume, sell_to.as_ref())?;

        let inter = buy_from.get_tokens_out(self.base_token, opportunity.token, opportunity.volume)?;
        let sell_call = sell_to.sell_tokens(opportunity.token, inter, self.executor_contract)?;
        calls.push(sell_to.address(), sell_call);

        Ok(calls)
    }

    pub fn build(&self, opportunity: &CrossedMarket, fees: &FeeParams) -> CoreResult<ArbitrageBundle> {
        let calls = self.encode_calls(opportunity)?;
        let miner_reward = opportunity.miner_reward(self.config.miner_reward_percentage);

        let settlement_call = IBundleExecutor::uniswapWethCall {
            _wethAmountToFirstMarket: opportunity.volume,
            _ethAmountToCoinbase: miner_reward,
            _targets: calls.targets.clone(),
            _payloads: calls.data.clone(),
        };

        let settlement = BuiltTransaction {
            chain_id: self.chain_id,
            to: self.executor_contract,
            value: U256::ZERO,
            data: Bytes::from(settlement_call.abi_encode()),
            gas_limit: self.config.fallback_gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee: fees.max_priority_fee_per_gas,
        };

        let decoy = BuiltTransaction {
            chain_id: self.chain_id,
            to: self.searcher,
            value: U256::ZERO,
            data: Bytes::new(),
            gas_limit: self.config.decoy_gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee: fees.max_priority_fee_per_gas,
        };

        Ok(ArbitrageBundle {
            settlement,
            decoy,
            calls,
            miner_reward,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::I256;
    use crossarb_core::{ether_div, ether_mul, DexProtocol, Market, GWEI};
    use crossarb_markets::UniswapV2Pair;
    use std::sync::Arc;

    fn weth() -> Address {
        Address::repeat_byte(0xee)
    }

    fn token() -> Address {
        Address::repeat_byte(0x01)
    }

    fn market(byte: u8, token_reserve: u64) -> Arc<dyn Market> {
        Arc::new(
            UniswapV2Pair::new(Address::repeat_byte(byte), [token(), weth()], DexProtocol::UniswapV2)
                .with_reserves(ether_mul(token_reserve), ether_mul(10)),
        )
    }

    fn opportunity() -> CrossedMarket {
        CrossedMarket {
            profit: I256::from_raw(ether_div(100)),
            volume: ether_div(4),
            token: token(),
            sell_to_market: market(0x11, 900),
            buy_from_market: market(0x10, 1000),
        }
    }

    fn builder() -> BundleBuilder {
        BundleBuilder::new(
            1,
            weth(),
            Address::repeat_byte(0xbe),
            Address::repeat_byte(0x5e),
            ExecutionConfig::default(),
        )
    }

    fn fees() -> FeeParams {
        FeeParams {
            max_fee_per_gas: GWEI * U256::from(40),
            max_priority_fee_per_gas: GWEI * U256::from(3),
        }
    }

    #[test]
    fn test_calls_route_through_both_markets() {
        let opportunity = opportunity();
        let calls = builder().encode_calls(&opportunity).unwrap();

        assert_eq!(
            calls.targets,
            vec![Address::repeat_byte(0x10), Address::repeat_byte(0x11)]
        );
        assert_eq!(
            calls.data[0],
            opportunity
                .buy_from_market
                .sell_tokens(weth(), opportunity.volume, Address::repeat_byte(0x11))
                .unwrap()
        );
        let inter = opportunity
            .buy_from_market
            .get_tokens_out(weth(), token(), opportunity.volume)
            .unwrap();
        assert_eq!(
            calls.data[1],
            opportunity
                .sell_to_market
                .sell_tokens(token(), inter, Address::repeat_byte(0xbe))
                .unwrap()
        );
    }

    #[test]
    fn test_settlement_encodes_reward_and_calls() {
        let bundle = builder().build(&opportunity(), &fees()).unwrap();

        assert_eq!(bundle.miner_reward, ether_div(100) * U256::from(80) / U256::from(100));
        assert_eq!(bundle.settlement.to, Address::repeat_byte(0xbe));
        assert_eq!(bundle.settlement.gas_limit, 80_000);

        let decoded = IBundleExecutor::uniswapWethCall::abi_decode(&bundle.settlement.data, true).unwrap();
        assert_eq!(decoded._wethAmountToFirstMarket, ether_div(4));
        assert_eq!(decoded._ethAmountToCoinbase, bundle.miner_reward);
        assert_eq!(decoded._targets, bundle.calls.targets);
        assert_eq!(decoded._payloads, bundle.calls.data);
    }

    #[test]
    fn test_decoy_is_plain_self_transfer() {
        let mut bundle = builder().build(&opportunity(), &fees()).unwrap();
        bundle.set_settlement_gas_limit(123_456);

        let txs = bundle.transactions();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].gas_limit, 123_456);

        let decoy = &txs[1];
        assert_eq!(decoy.to, Address::repeat_byte(0x5e));
        assert_eq!(decoy.gas_limit, 21_000);
        assert!(decoy.data.is_empty());
        assert_eq!(decoy.max_fee_per_gas, txs[0].max_fee_per_gas);
        assert_eq!(decoy.max_priority_fee, txs[0].max_priority_fee);
    }
}
