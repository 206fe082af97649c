//! Uniswap V2 style markets quoted against WETH
//!
//! Features:
//! - Constant-product pair market with lock-protected reserves
//! - Concurrent registry grouping pairs by token
//! - Batched pair discovery and reserve refresh over JSON-RPC

pub mod abi;
pub mod pair;
pub mod registry;
pub mod loader;

pub use pair::UniswapV2Pair;
pub use registry::{MarketRegistry, RegistryStats};
pub use loader::{ContractCaller, MarketLoader};
