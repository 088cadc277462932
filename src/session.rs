//! Wallet session establishment.
//!
//! A [`Session`] is created once per connection and classifies the connected
//! account against the contract's owner at that moment. It is never patched
//! afterwards; if ownership changes, connect again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::contract::{Address, TokenContract};
use crate::error::SessionError;
use crate::wallet::{ReadHandle, SigningHandle, WalletProvider};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    User,
}

impl Role {
    /// Owner iff `account` is the contract's owner. [`Address`] equality is
    /// over bytes, so checksum casing never matters.
    pub fn classify(account: Address, owner: Address) -> Self {
        if account == owner {
            Self::Owner
        } else {
            Self::User
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authenticated wallet connection.
#[derive(Debug, Clone)]
pub struct Session {
    address: Address,
    role: Role,
    created_at: DateTime<Utc>,
    signer: SigningHandle,
}

impl Session {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn signer(&self) -> &SigningHandle {
        &self.signer
    }

    pub fn reader(&self) -> ReadHandle {
        self.signer.reader()
    }
}

/// Turns a wallet provider into a classified [`Session`].
pub struct SessionEstablisher {
    provider: Option<Arc<dyn WalletProvider>>,
    contract: TokenContract,
}

impl SessionEstablisher {
    /// `provider` is `None` when no wallet is present in the environment.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, contract: TokenContract) -> Self {
        Self { provider, contract }
    }

    pub async fn connect(&self) -> Result<Session, SessionError> {
        let provider = self
            .provider
            .clone()
            .ok_or(SessionError::ProviderUnavailable)?;

        let accounts = provider.request_accounts().await.inspect_err(|e| {
            tracing::warn!(code = ?e.code, "account access request failed: {}", e);
        })?;
        if accounts.is_empty() {
            return Err(SessionError::ConnectionFailed(
                "wallet authorized no accounts".to_string(),
            ));
        }

        let address = provider.signer().await?;
        let signer = SigningHandle::new(provider, address);
        let owner = self.contract.owner(&signer.reader()).await?;
        let role = Role::classify(address, owner);

        tracing::info!(%address, %role, contract = %self.contract.address(), "wallet connected");
        Ok(Session {
            address,
            role,
            created_at: Utc::now(),
            signer,
        })
    }
}
