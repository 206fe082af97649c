//! WETH balance watcher

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crossarb_core::format_ether;
use crossarb_markets::abi::IERC20;
use crossarb_markets::ContractCaller;

use crate::chain::{BlockPoller, BlockSource};

/// Reports whenever an account's token balance changes
pub struct BalanceMonitor<C> {
    caller: C,
    token: Address,
    account: Address,
    last_balance: Option<U256>,
}

impl<C: ContractCaller> BalanceMonitor<C> {
    pub fn new(caller: C, token: Address, account: Address) -> Self {
        Self {
            caller,
            token,
            account,
            last_balance: None,
        }
    }

    pub async fn balance(&self) -> anyhow::Result<U256> {
        let call = IERC20::balanceOfCall { owner: self.account };
        let raw = self.caller.call(self.token, Bytes::from(call.abi_encode())).await?;
        Ok(IERC20::balanceOfCall::abi_decode_returns(&raw, true)?._0)
    }

    /// New balance when it differs from the previous check
    pub async fn check(&mut self) -> anyhow::Result<Option<U256>> {
        let balance = self.balance().await?;
        if self.last_balance == Some(balance) {
            return Ok(None);
        }
        self.last_balance = Some(balance);
        Ok(Some(balance))
    }

    /// Check once per new block until shutdown
    pub async fn run<B: BlockSource>(mut self, chain: B, poll_interval: Duration, mut shutdown: oneshot::Receiver<()>) {
        info!("Monitoring WETH balance of {}", self.account);

        let mut poller = BlockPoller::new();
        let mut interval = tokio::time::interval(poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let block = match chain.block_number().await {
                        Ok(n) => n,
                        Err(e) => {
                            warn!("Failed to fetch block number: {:#}", e);
                            continue;
                        }
                    };
                    let Some(block) = poller.observe(block) else { continue };

                    match self.check().await {
                        Ok(Some(balance)) => info!("[{}] New balance for {}: {} WETH", block, self.account, format_ether(balance)),
                        Ok(None) => {}
                        Err(e) => warn!("Balance check failed at block {}: {:#}", block, e),
                    }
                }
                _ = &mut shutdown => {
                    info!("Balance monitor shutdown requested");
                    break;
                }
            }
        }
    }
}
