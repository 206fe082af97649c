//! Well-known contract addresses
//!
//! Every market the bot trades quotes against WETH, so WETH is the base asset
//! for each supported chain.

use alloy_primitives::{address, Address};

use crate::{ChainId, DexProtocol};

/// WETH on Ethereum mainnet
pub const WETH_ADDRESS: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

/// WETH on Goerli
pub const GOERLI_WETH_ADDRESS: Address = address!("b4fbf271143f4fbf7b91a5ded31805e42b2208d6");

/// Batch query helper contract (`getPairsByIndexRange`, `getReservesByPairs`)
pub const UNISWAP_QUERY_ADDRESS: Address = address!("5ef1009b9fcd4fec3094a5564047e190d72bd511");

/// Uniswap V2 style factories scanned for pairs on mainnet
pub const FACTORY_ADDRESSES: [(DexProtocol, Address); 5] = [
    (DexProtocol::CroDefiSwap, address!("9deb29c9a4c7a88a3c0257393b7f3335338d9a9d")),
    (DexProtocol::Zeus, address!("bdda21dd8da31d5bee0c9bb886c044ebb9b8906a")),
    (DexProtocol::LuaSwap, address!("0388c1e0f210abae597b7de712b9510c6c36c857")),
    (DexProtocol::SushiSwap, address!("c0aee478e3658e2610c5f7a4a2e1777ce9e4f2ac")),
    (DexProtocol::UniswapV2, address!("5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f")),
];

/// Base asset for a chain
pub fn weth_address(chain: ChainId) -> Address {
    match chain {
        ChainId::Ethereum => WETH_ADDRESS,
        ChainId::Goerli => GOERLI_WETH_ADDRESS,
    }
}
