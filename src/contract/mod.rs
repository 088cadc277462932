//! Binding for the externally deployed token contract.
//!
//! The contract itself is not part of this crate; only its call surface is.

pub mod abi;
mod methods;

pub use self::abi::{AbiError, Address, Word};
pub use self::methods::{ContractCall, ContractMethod};

use std::fmt;

use serde::Serialize;

use crate::error::ProviderError;
use crate::wallet::{CallRequest, ReadHandle, TransactionRequest};

/// One entry of `getUserTransactions`, a `(bytes32, uint256)` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserTransaction {
    #[serde(serialize_with = "serialize_hash")]
    pub transaction_hash: Word,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

impl UserTransaction {
    pub fn from_words([hash, timestamp]: [Word; 2]) -> Result<Self, AbiError> {
        let timestamp = abi::word_to_u128(&timestamp)
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| AbiError::UnexpectedValue("timestamp out of range".to_string()))?;
        Ok(Self {
            transaction_hash: hash,
            timestamp,
        })
    }

    pub fn to_words(&self) -> [Word; 2] {
        [
            self.transaction_hash,
            abi::uint_word(u128::from(self.timestamp)),
        ]
    }

    pub fn hash_hex(&self) -> String {
        abi::encode_hex_prefixed(&self.transaction_hash)
    }
}

impl fmt::Display for UserTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.hash_hex(), self.timestamp)
    }
}

fn serialize_hash<S: serde::Serializer>(hash: &Word, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&abi::encode_hex_prefixed(hash))
}

/// Typed access to the contract at a fixed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenContract {
    address: Address,
}

impl TokenContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read(
        &self,
        reader: &ReadHandle,
        call: ContractCall,
    ) -> Result<Vec<u8>, ProviderError> {
        tracing::debug!(method = %call.method(), contract = %self.address, "contract read");
        reader
            .call(&CallRequest {
                to: self.address,
                data: call.encode(),
            })
            .await
    }

    pub async fn owner(&self, reader: &ReadHandle) -> Result<Address, ProviderError> {
        let data = self.read(reader, ContractCall::Owner).await?;
        abi::decode_address(&data).map_err(|e| malformed(ContractMethod::Owner, e))
    }

    pub async fn is_account_frozen(
        &self,
        reader: &ReadHandle,
        account: Address,
    ) -> Result<bool, ProviderError> {
        let data = self
            .read(reader, ContractCall::IsAccountFrozen(account))
            .await?;
        abi::decode_bool(&data).map_err(|e| malformed(ContractMethod::IsAccountFrozen, e))
    }

    pub async fn is_paused(&self, reader: &ReadHandle) -> Result<bool, ProviderError> {
        let data = self.read(reader, ContractCall::IsPaused).await?;
        abi::decode_bool(&data).map_err(|e| malformed(ContractMethod::IsPaused, e))
    }

    pub async fn user_transactions(
        &self,
        reader: &ReadHandle,
        account: Address,
    ) -> Result<Vec<UserTransaction>, ProviderError> {
        let data = self
            .read(reader, ContractCall::GetUserTransactions(account))
            .await?;
        abi::decode_tuple_array::<2>(&data)
            .and_then(|entries| {
                entries
                    .into_iter()
                    .map(UserTransaction::from_words)
                    .collect()
            })
            .map_err(|e| malformed(ContractMethod::GetUserTransactions, e))
    }

    /// State-changing call from `from`, carrying no value.
    pub fn transaction(&self, from: Address, call: ContractCall) -> TransactionRequest {
        TransactionRequest {
            from,
            to: self.address,
            value: 0,
            data: call.encode(),
        }
    }
}

fn malformed(method: ContractMethod, err: AbiError) -> ProviderError {
    ProviderError::transport(format!("malformed {method} return data: {err}"))
}
