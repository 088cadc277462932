//! Ethereum JSON-RPC provider over HTTP.
//!
//! Talks to any endpoint that signs on the caller's behalf: a wallet bridge
//! exposing EIP-1193 methods, or a development node with unlocked accounts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{CallRequest, Receipt, TransactionRequest, TxHash, WalletProvider};
use crate::contract::Address;
use crate::contract::abi::{decode_hex_prefixed, encode_hex_prefixed};
use crate::error::ProviderError;

const METHOD_NOT_FOUND: i64 = -32601;
const UNAUTHORIZED_ACCOUNT: i64 = 4100;

#[derive(Debug)]
pub struct JsonRpcProvider {
    client: Client,
    endpoint: url::Url,
    poll_interval: Duration,
    /// Preferred signing account. `None` signs with the first authorized one.
    account: Option<Address>,
    next_id: AtomicU64,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl JsonRpcProvider {
    pub fn new(
        endpoint: &str,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, ProviderError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| ProviderError::transport(format!("invalid RPC URL '{endpoint}': {e}")))?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            poll_interval,
            account: None,
            next_id: AtomicU64::new(1),
        })
    }

    /// Sign with `account` instead of the first authorized account.
    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method, id, endpoint = %self.endpoint, "JSON-RPC request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("{method} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::transport(format!(
                "{method} returned HTTP {status}"
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(format!("{method} response unreadable: {e}")))?;
        parse_response(body)
    }
}

fn parse_response<T: DeserializeOwned>(body: RpcResponse) -> Result<T, ProviderError> {
    if let Some(err) = body.error {
        return Err(ProviderError::new(Some(err.code), err.message));
    }
    serde_json::from_value(body.result.unwrap_or(Value::Null))
        .map_err(|e| ProviderError::transport(format!("unexpected JSON-RPC result: {e}")))
}

fn parse_quantity(raw: &str) -> Result<u64, ProviderError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ProviderError::transport(format!("quantity '{raw}' is not 0x-prefixed")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::transport(format!("invalid quantity '{raw}': {e}")))
}

fn transaction_params(tx: &TransactionRequest) -> Value {
    let mut object = json!({
        "from": tx.from,
        "to": tx.to,
        "value": format!("{:#x}", tx.value),
    });
    if !tx.data.is_empty() {
        object["data"] = Value::String(encode_hex_prefixed(&tx.data));
    }
    json!([object])
}

fn receipt_from_rpc(receipt: RpcReceipt) -> Result<Receipt, ProviderError> {
    let tx_hash = TxHash::new(&receipt.transaction_hash);
    if receipt.status.as_deref() == Some("0x0") {
        return Err(ProviderError::transport(format!(
            "transaction {tx_hash} reverted"
        )));
    }
    let block_number = receipt
        .block_number
        .as_deref()
        .map(parse_quantity)
        .transpose()?;
    Ok(Receipt {
        tx_hash,
        block_number,
    })
}

#[async_trait]
impl WalletProvider for JsonRpcProvider {
    fn name(&self) -> &str {
        "json-rpc"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        match self.request("eth_requestAccounts", json!([])).await {
            Err(err) if err.code == Some(METHOD_NOT_FOUND) => {
                tracing::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.request("eth_accounts", json!([])).await
            }
            other => other,
        }
    }

    /// Reads the already-authorized accounts; never prompts the wallet.
    async fn signer(&self) -> Result<Address, ProviderError> {
        let accounts: Vec<Address> = self.request("eth_accounts", json!([])).await?;
        match self.account {
            Some(wanted) if accounts.contains(&wanted) => Ok(wanted),
            Some(wanted) => Err(ProviderError::new(
                Some(UNAUTHORIZED_ACCOUNT),
                format!("account {wanted} is not authorized by the wallet"),
            )),
            None => accounts
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::transport("wallet exposed no accounts")),
        }
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        let raw: String = self
            .request(
                "eth_call",
                json!([
                    { "to": request.to, "data": encode_hex_prefixed(&request.data) },
                    "latest"
                ]),
            )
            .await?;
        decode_hex_prefixed(&raw)
            .map_err(|e| ProviderError::transport(format!("eth_call returned bad hex: {e}")))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ProviderError> {
        let hash: String = self
            .request("eth_sendTransaction", transaction_params(tx))
            .await?;
        Ok(TxHash::new(hash))
    }

    async fn wait_for_confirmation(&self, hash: &TxHash) -> Result<Receipt, ProviderError> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .request("eth_getTransactionReceipt", json!([hash.as_str()]))
                .await?;
            if let Some(receipt) = receipt {
                return receipt_from_rpc(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
