//! Crossed-market arbitrage bot
//!
//! Wires the detector and executor to a JSON-RPC node and the Flashbots relay

pub mod config;
pub mod chain;
pub mod flashbots;
pub mod runner;
pub mod monitor;

pub use self::config::{AppConfig, NodeConfig};
pub use chain::{BlockPoller, BlockSource, ChainClient, NonceSource};
pub use flashbots::FlashbotsRelay;
pub use runner::{BlockOutcome, BlockRunner, Healthcheck, InFlightGuard};
pub use monitor::BalanceMonitor;
