//! Wallet provider boundary.
//!
//! A provider is an opaque capability supplied by a wallet: it grants account
//! access, signs and submits transactions, and reports confirmations. Any
//! implementation of [`WalletProvider`] is interchangeable.

mod memory;
mod rpc;

pub use self::memory::{BLOCK_TIME_SECS, CallCounts, GENESIS_TIMESTAMP, MemoryProvider};
pub use self::rpc::JsonRpcProvider;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::contract::Address;
use crate::error::ProviderError;

/// Hash of a submitted transaction, `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only contract query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Vec<u8>,
}

/// Transaction to be signed by `from`. Empty `data` is a plain value transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

/// Confirmation of a transaction that executed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Ask the wallet holder for account access.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Account the provider will sign for.
    async fn signer(&self) -> Result<Address, ProviderError>;

    /// Execute a read-only call against current chain state.
    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, ProviderError>;

    /// Sign and submit. Resolves once the wallet has signed or declined.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ProviderError>;

    /// Resolve once the network reports the transaction included. May never
    /// resolve; callers own any timeout.
    async fn wait_for_confirmation(&self, hash: &TxHash) -> Result<Receipt, ProviderError>;
}

/// Capability to sign for one account, owned by a session.
#[derive(Clone)]
pub struct SigningHandle {
    provider: Arc<dyn WalletProvider>,
    account: Address,
}

impl SigningHandle {
    pub fn new(provider: Arc<dyn WalletProvider>, account: Address) -> Self {
        Self { provider, account }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Non-signing handle over the same provider.
    pub fn reader(&self) -> ReadHandle {
        ReadHandle {
            provider: Arc::clone(&self.provider),
        }
    }

    /// Submit `tx` for signing. `tx.from` is forced to the handle's account.
    pub async fn send(
        &self,
        mut tx: TransactionRequest,
    ) -> Result<PendingTransaction, ProviderError> {
        tx.from = self.account;
        let hash = self.provider.send_transaction(&tx).await?;
        tracing::debug!(
            tx_hash = %hash,
            provider = self.provider.name(),
            "transaction submitted"
        );
        Ok(PendingTransaction {
            hash,
            provider: Arc::clone(&self.provider),
        })
    }
}

impl fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningHandle")
            .field("provider", &self.provider.name())
            .field("account", &self.account)
            .finish()
    }
}

/// Capability to run read-only calls.
#[derive(Clone)]
pub struct ReadHandle {
    provider: Arc<dyn WalletProvider>,
}

impl ReadHandle {
    pub async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        self.provider.call(request).await
    }
}

impl fmt::Debug for ReadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// A submitted transaction. There is no way to cancel it.
pub struct PendingTransaction {
    hash: TxHash,
    provider: Arc<dyn WalletProvider>,
}

impl PendingTransaction {
    pub fn hash(&self) -> &TxHash {
        &self.hash
    }

    pub async fn wait(&self) -> Result<Receipt, ProviderError> {
        self.provider.wait_for_confirmation(&self.hash).await
    }
}

impl fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .finish()
    }
}
