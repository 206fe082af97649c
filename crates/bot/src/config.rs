//! Application configuration
//!
//! Read from an optional TOML file, then environment variables. Environment
//! keys use the deployment names (`ETHEREUM_RPC_URL`, `PRIVATE_KEY`, ...).

use alloy_primitives::Address;
use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crossarb_core::{ChainId, EvaluationConfig, ExecutionConfig, LoaderConfig};

pub const DEFAULT_CONFIG_FILE: &str = "crossarb";

fn default_miner_reward_percentage() -> u8 {
    80
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// `url` with basic-auth credentials when both parts are set
fn authenticated_url(url: &str, user: Option<&str>, secret: Option<&str>) -> anyhow::Result<String> {
    let (Some(user), Some(secret)) = (user, secret) else {
        return Ok(url.to_string());
    };
    let mut parsed = Url::parse(url).context("ETHEREUM_RPC_URL is not a valid URL")?;
    parsed
        .set_username(user)
        .and_then(|_| parsed.set_password(Some(secret)))
        .map_err(|_| anyhow::anyhow!("ETHEREUM_RPC_URL cannot carry credentials"))?;
    Ok(parsed.into())
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub ethereum_rpc_url: String,

    /// Basic-auth user for the RPC node
    #[serde(default)]
    pub infura_api_user: Option<String>,

    #[serde(default)]
    pub infura_api_secret: Option<String>,

    /// Key of the wallet that owns the bundle executor
    pub private_key: String,

    pub bundle_executor_address: Address,

    /// Key identifying the searcher to the relay, random when unset
    #[serde(default)]
    pub flashbots_relay_signing_key: Option<String>,

    #[serde(default = "default_miner_reward_percentage")]
    pub miner_reward_percentage: u8,

    #[serde(default)]
    pub use_testnet: bool,

    #[serde(default)]
    pub healthcheck_url: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub loader: LoaderConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("ethereum_rpc_url", &self.ethereum_rpc_url)
            .field("infura_api_user", &self.infura_api_user)
            .field("bundle_executor_address", &self.bundle_executor_address)
            .field("miner_reward_percentage", &self.miner_reward_percentage)
            .field("use_testnet", &self.use_testnet)
            .field("healthcheck_url", &self.healthcheck_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish_non_exhaustive()
    }
}

/// `<file>.toml` (optional unless named) overlaid with the environment
fn settings(file: Option<&str>) -> anyhow::Result<Config> {
    Config::builder()
        .add_source(File::with_name(file.unwrap_or(DEFAULT_CONFIG_FILE)).required(file.is_some()))
        .add_source(Environment::default())
        .build()
        .context("reading configuration")
}

/// Just enough to follow the chain, for commands that never sign
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub ethereum_rpc_url: String,

    #[serde(default)]
    pub infura_api_user: Option<String>,

    #[serde(default)]
    pub infura_api_secret: Option<String>,

    #[serde(default)]
    pub use_testnet: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl NodeConfig {
    pub fn load(file: Option<&str>) -> anyhow::Result<Self> {
        settings(file)?
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn rpc_url(&self) -> anyhow::Result<String> {
        authenticated_url(
            &self.ethereum_rpc_url,
            self.infura_api_user.as_deref(),
            self.infura_api_secret.as_deref(),
        )
    }

    pub fn chain(&self) -> ChainId {
        ChainId::from_testnet_flag(self.use_testnet)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Load from `<file>.toml` (optional) and the environment
    pub fn load(file: Option<&str>) -> anyhow::Result<Self> {
        Self::from_settings(settings(file)?)
    }

    pub fn from_toml(toml: &str) -> anyhow::Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .context("parsing configuration")?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> anyhow::Result<Self> {
        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ethereum_rpc_url.is_empty() {
            anyhow::bail!("ETHEREUM_RPC_URL is empty");
        }
        if self.private_key.is_empty() {
            anyhow::bail!("PRIVATE_KEY is empty");
        }
        self.rpc_url()?;
        self.evaluation.validate()?;
        self.execution_config().validate()?;
        Ok(())
    }

    /// RPC endpoint, with the node credentials applied when configured
    pub fn rpc_url(&self) -> anyhow::Result<String> {
        authenticated_url(
            &self.ethereum_rpc_url,
            self.infura_api_user.as_deref(),
            self.infura_api_secret.as_deref(),
        )
    }

    pub fn chain(&self) -> ChainId {
        ChainId::from_testnet_flag(self.use_testnet)
    }

    /// Execution settings with the top-level reward percentage applied
    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            miner_reward_percentage: self.miner_reward_percentage,
            ..self.execution.clone()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
