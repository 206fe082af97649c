//! Flashbots relay client
//!
//! Signs bundle transactions with the executor wallet and talks JSON-RPC to
//! the relay. Every request carries an `X-Flashbots-Signature` header made
//! with a separate reputation key.

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy_primitives::{hex, keccak256, Address, Bytes, TxKind, B256, U64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crossarb_core::{ExecutionError, ExecutionResult, RelayError};
use crossarb_executor::{BuiltTransaction, BundleRelay, BundleSubmission, CallBundleResponse, SignedBundle, SimulationResult};

use crate::chain::NonceSource;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleResult {
    #[serde(default)]
    bundle_hash: Option<B256>,
}

/// `eth_callBundle` parameters simulating against the latest state
pub fn call_bundle_params(bundle: &SignedBundle, target_block: u64) -> Value {
    json!([{
        "txs": bundle.transactions,
        "blockNumber": U64::from(target_block),
        "stateBlockNumber": "latest",
    }])
}

/// `eth_sendBundle` parameters
pub fn send_bundle_params(bundle: &SignedBundle, target_block: u64) -> Value {
    json!([{
        "txs": bundle.transactions,
        "blockNumber": U64::from(target_block),
    }])
}

/// `<address>:<signature>` over the hex keccak-256 of the request body
pub fn flashbots_signature(signer: &PrivateKeySigner, body: &[u8]) -> Result<String, RelayError> {
    let digest = hex::encode_prefixed(keccak256(body));
    let signature = signer
        .sign_message_sync(digest.as_bytes())
        .map_err(|e| RelayError::Transport(format!("signing relay request: {}", e)))?;
    Ok(format!(
        "{}:{}",
        signer.address(),
        hex::encode_prefixed(signature.as_bytes())
    ))
}

/// Sign one EIP-1559 transaction and return its 2718 encoding
pub fn sign_transaction(wallet: &PrivateKeySigner, transaction: &BuiltTransaction, nonce: u64) -> ExecutionResult<Bytes> {
    let mut tx = TxEip1559 {
        chain_id: transaction.chain_id,
        nonce,
        gas_limit: transaction.gas_limit,
        max_fee_per_gas: transaction.max_fee_per_gas.saturating_to::<u128>(),
        max_priority_fee_per_gas: transaction.max_priority_fee.saturating_to::<u128>(),
        to: TxKind::Call(transaction.to),
        value: transaction.value,
        access_list: Default::default(),
        input: transaction.data.clone(),
    };
    let signature = wallet
        .sign_transaction_sync(&mut tx)
        .map_err(|e| ExecutionError::Signing(e.to_string()))?;
    let envelope: TxEnvelope = tx.into_signed(signature).into();
    Ok(Bytes::from(envelope.encoded_2718()))
}

pub struct FlashbotsRelay<N> {
    http: reqwest::Client,
    relay_url: String,
    auth_signer: PrivateKeySigner,
    wallet: PrivateKeySigner,
    nonces: N,
}

impl<N: NonceSource> FlashbotsRelay<N> {
    pub fn new(relay_url: impl Into<String>, auth_signer: PrivateKeySigner, wallet: PrivateKeySigner, nonces: N) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: relay_url.into(),
            auth_signer,
            wallet,
            nonces,
        }
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet.address()
    }

    async fn request(&self, method: &str, params: Value) -> Result<JsonRpcResponse, RelayError> {
        let body = serde_json::to_vec(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        })
        .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        let signature = flashbots_signature(&self.auth_signer, &body)?;

        debug!("Relay request {} ({} bytes)", method, body.len());

        let response = self
            .http
            .post(&self.relay_url)
            .header("Content-Type", "application/json")
            .header("X-Flashbots-Signature", signature)
            .body(body)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        response
            .json::<JsonRpcResponse>()
            .await
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl<N: NonceSource> BundleRelay for FlashbotsRelay<N> {
    async fn sign_bundle(&self, transactions: &[BuiltTransaction]) -> ExecutionResult<SignedBundle> {
        let first_nonce = self
            .nonces
            .next_nonce(self.wallet.address())
            .await
            .map_err(|e| RelayError::Transport(format!("fetching nonce: {:#}", e)))?;

        let signed = transactions
            .iter()
            .enumerate()
            .map(|(i, tx)| sign_transaction(&self.wallet, tx, first_nonce + i as u64))
            .collect::<ExecutionResult<Vec<_>>>()?;

        Ok(SignedBundle { transactions: signed })
    }

    async fn simulate(&self, bundle: &SignedBundle, target_block: u64) -> Result<SimulationResult, RelayError> {
        let response = self
            .request("eth_callBundle", call_bundle_params(bundle, target_block))
            .await?;

        if let Some(error) = response.error {
            return Ok(SimulationResult::Error(error.message));
        }
        let result = response
            .result
            .ok_or_else(|| RelayError::InvalidResponse("eth_callBundle returned no result".into()))?;
        let body: CallBundleResponse =
            serde_json::from_value(result).map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        SimulationResult::from_call_bundle(body)
    }

    async fn submit(&self, bundle: &SignedBundle, target_block: u64) -> Result<BundleSubmission, RelayError> {
        let response = self
            .request("eth_sendBundle", send_bundle_params(bundle, target_block))
            .await?;

        if let Some(error) = response.error {
            return Err(RelayError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let bundle_hash = response
            .result
            .and_then(|r| serde_json::from_value::<SendBundleResult>(r).ok())
            .and_then(|r| r.bundle_hash);

        Ok(BundleSubmission {
            target_block,
            bundle_hash,
        })
    }
}
