//! Uniswap V2 style pair market

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use parking_lot::RwLock;
use std::fmt;

use crossarb_core::{
    get_amount_in, get_amount_out, CoreError, CoreResult, DexProtocol, Market, MultipleCallData,
};

use crate::abi::IUniswapV2Pair;

/// Constant-product pair with reserves refreshed from the chain
pub struct UniswapV2Pair {
    address: Address,
    tokens: [Address; 2],
    protocol: DexProtocol,
    reserves: RwLock<[U256; 2]>,
}

impl UniswapV2Pair {
    pub fn new(address: Address, tokens: [Address; 2], protocol: DexProtocol) -> Self {
        Self {
            address,
            tokens,
            protocol,
            reserves: RwLock::new([U256::ZERO; 2]),
        }
    }

    pub fn with_reserves(mut self, reserve0: U256, reserve1: U256) -> Self {
        *self.reserves.get_mut() = [reserve0, reserve1];
        self
    }

    pub fn set_reserves(&self, reserve0: U256, reserve1: U256) {
        *self.reserves.write() = [reserve0, reserve1];
    }

    pub fn reserves(&self) -> [U256; 2] {
        *self.reserves.read()
    }

    /// Reserve held of `token`
    pub fn balance(&self, token: Address) -> CoreResult<U256> {
        let index = self.token_index(token)?;
        Ok(self.reserves.read()[index])
    }

    fn token_index(&self, token: Address) -> CoreResult<usize> {
        self.tokens
            .iter()
            .position(|t| *t == token)
            .ok_or(CoreError::TokenNotInMarket {
                token,
                market: self.address,
            })
    }

    fn reserves_for(&self, token_in: Address, token_out: Address) -> CoreResult<(U256, U256)> {
        let reserves = self.reserves.read();
        let reserve_in = reserves[self.token_index(token_in)?];
        let reserve_out = reserves[self.token_index(token_out)?];
        Ok((reserve_in, reserve_out))
    }
}

impl fmt::Debug for UniswapV2Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniswapV2Pair")
            .field("address", &self.address)
            .field("protocol", &self.protocol)
            .field("tokens", &self.tokens)
            .field("reserves", &self.reserves())
            .finish()
    }
}

impl Market for UniswapV2Pair {
    fn protocol(&self) -> DexProtocol {
        self.protocol
    }

    fn address(&self) -> Address {
        self.address
    }

    fn tokens(&self) -> [Address; 2] {
        self.tokens
    }

    fn get_tokens_out(&self, token_in: Address, token_out: Address, amount_in: U256) -> CoreResult<U256> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in, token_out)?;
        Ok(get_amount_out(reserve_in, reserve_out, amount_in))
    }

    fn get_tokens_in(&self, token_in: Address, token_out: Address, amount_out: U256) -> CoreResult<U256> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in, token_out)?;
        Ok(get_amount_in(reserve_in, reserve_out, amount_out))
    }

    fn receive_directly(&self, _token: Address) -> bool {
        true
    }

    fn sell_tokens_to_next_market(
        &self,
        token_in: Address,
        amount_in: U256,
        next: &dyn Market,
    ) -> CoreResult<MultipleCallData> {
        let token_out = self.tokens[1 - self.token_index(token_in)?];
        if !next.receive_directly(token_out) {
            return Err(CoreError::NoDirectRoute {
                token: token_out,
                market: next.address(),
            });
        }
        let call = self.sell_tokens(token_in, amount_in, next.address())?;
        Ok(MultipleCallData::single(self.address, call))
    }

    fn sell_tokens(&self, token_in: Address, amount_in: U256, recipient: Address) -> CoreResult<Bytes> {
        let index_in = self.token_index(token_in)?;
        let token_out = self.tokens[1 - index_in];
        let amount_out = self.get_tokens_out(token_in, token_out, amount_in)?;

        let (amount0_out, amount1_out) = if index_in == 0 {
            (U256::ZERO, amount_out)
        } else {
            (amount_out, U256::ZERO)
        };

        let call = IUniswapV2Pair::swapCall {
            amount0Out: amount0_out,
            amount1Out: amount1_out,
            to: recipient,
            data: Bytes::new(),
        };
        Ok(Bytes::from(call.abi_encode()))
    }
}
