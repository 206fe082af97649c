//! Crossed-market arbitrage detection engine
//!
//! Features:
//! - Probe-price detection of crossed market pairs per token
//! - Pluggable trade-size search over a volume ladder
//! - Ranked evaluation of a whole market snapshot, optionally on rayon

pub mod scanner;
pub mod strategies;
pub mod optimizer;

pub use scanner::ArbitrageEvaluator;
pub use strategies::{CrossedPair, CrossedPairDetector, PricedMarket};
pub use optimizer::{LadderSearch, VolumeSearch};
