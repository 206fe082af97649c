//! Core types and utilities for the crossed-market arbitrage bot
//!
//! This crate provides shared types used across all components:
//! - Chain definitions and amount helpers
//! - The `Market` abstraction over AMM pools and constant-product math
//! - Call sequences handed to the bundle executor contract
//! - Crossed-market opportunity types
//! - Configuration and error types

pub mod types;
pub mod tokens;
pub mod pools;
pub mod quotes;
pub mod opportunities;
pub mod config;
pub mod errors;

pub use types::*;
pub use tokens::*;
pub use pools::*;
pub use quotes::*;
pub use opportunities::*;
pub use config::*;
pub use errors::*;
