//! Privileged-action gateway.
//!
//! Every action runs through the same lifecycle: validate parameters, check
//! the session role, then either query through the read handle or submit
//! through the signing handle and wait for confirmation. Nothing is retried.

mod action;

pub use self::action::{Action, ActionCall, ActionKind, ActionRequest, RequiredRole};

use serde::Serialize;

use crate::contract::{Address, ContractCall, TokenContract};
use crate::error::{ActionError, ErrorKind, ProviderError};
use crate::session::Session;
use crate::units;
use crate::wallet::{TransactionRequest, TxHash};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Rejected,
    Failed,
}

/// Result of one executed action. Produced once, never mutated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: ActionKind,
    pub status: OutcomeStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// The session that ran this action no longer reflects chain state and
    /// must be re-established.
    pub requires_reconnect: bool,
}

impl ActionOutcome {
    fn success(action: ActionKind, detail: String, tx_hash: Option<TxHash>) -> Self {
        Self {
            action,
            status: OutcomeStatus::Success,
            detail,
            error_kind: None,
            tx_hash,
            requires_reconnect: false,
        }
    }

    /// Classify a provider failure: the 4001 code is a rejection, anything
    /// else a failure with the provider's message kept verbatim.
    fn from_provider_error(
        action: ActionKind,
        err: ProviderError,
        tx_hash: Option<TxHash>,
    ) -> Self {
        let (status, error_kind) = if err.is_user_rejection() {
            (OutcomeStatus::Rejected, ErrorKind::UserRejected)
        } else {
            (OutcomeStatus::Failed, ErrorKind::Failed)
        };
        Self {
            action,
            status,
            detail: err.message,
            error_kind: Some(error_kind),
            tx_hash,
            requires_reconnect: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Executes actions against one contract on behalf of a session.
#[derive(Debug, Clone)]
pub struct ActionGateway {
    contract: TokenContract,
    value_decimals: u32,
    value_symbol: String,
}

impl ActionGateway {
    pub fn new(
        contract: TokenContract,
        value_decimals: u32,
        value_symbol: impl Into<String>,
    ) -> Self {
        Self {
            contract,
            value_decimals,
            value_symbol: value_symbol.into(),
        }
    }

    pub fn contract(&self) -> TokenContract {
        self.contract
    }

    /// Validate, authorize, and run `request`.
    ///
    /// `Err` means the request never left the process. Anything that reached
    /// the provider comes back as an [`ActionOutcome`]. If the network never
    /// confirms a submitted transaction this future never resolves; the
    /// transaction cannot be cancelled.
    pub async fn execute(
        &self,
        session: &Session,
        request: &ActionRequest,
    ) -> Result<ActionOutcome, ActionError> {
        let action = Action::validate(request, self.value_decimals)?;
        let kind = action.kind();

        let required = kind.required_role();
        if !required.permits(session.role()) {
            tracing::warn!(
                action = %kind,
                address = %session.address(),
                role = %session.role(),
                "unauthorized action blocked"
            );
            return Err(ActionError::Unauthorized {
                action: kind.to_string(),
                required: required.as_str().to_string(),
                actual: session.role().to_string(),
            });
        }

        let outcome = match action.call(session.address()) {
            ActionCall::Contract(ContractCall::IsAccountFrozen(account)) => {
                self.check_frozen(session, account).await
            }
            ActionCall::Contract(ContractCall::GetUserTransactions(account)) => {
                self.list_transactions(session, account).await
            }
            call => self.submit(session, &action, call).await,
        };

        match outcome.status {
            OutcomeStatus::Success => {
                tracing::info!(action = %kind, tx_hash = ?outcome.tx_hash, "{}", outcome.detail)
            }
            OutcomeStatus::Rejected | OutcomeStatus::Failed => {
                tracing::warn!(action = %kind, status = ?outcome.status, "{}", outcome.detail)
            }
        }
        Ok(outcome)
    }

    /// Current paused flag. Any role may read it; call whenever freshness
    /// matters, nothing caches it.
    pub async fn contract_paused(&self, session: &Session) -> Result<bool, ProviderError> {
        self.contract.is_paused(&session.reader()).await
    }

    async fn check_frozen(&self, session: &Session, account: Address) -> ActionOutcome {
        let kind = ActionKind::CheckFrozenStatus;
        match self
            .contract
            .is_account_frozen(&session.reader(), account)
            .await
        {
            Ok(frozen) => {
                let state = if frozen { "frozen" } else { "active" };
                ActionOutcome::success(kind, format!("Account {account} is {state}."), None)
            }
            Err(err) => ActionOutcome::from_provider_error(kind, err, None),
        }
    }

    async fn list_transactions(&self, session: &Session, account: Address) -> ActionOutcome {
        let kind = ActionKind::ListUserTransactions;
        match self
            .contract
            .user_transactions(&session.reader(), account)
            .await
        {
            Ok(entries) => {
                let mut detail = format!("{} transaction(s) for {account}", entries.len());
                for entry in &entries {
                    detail.push_str(&format!("\n  {entry}"));
                }
                ActionOutcome::success(kind, detail, None)
            }
            Err(err) => ActionOutcome::from_provider_error(kind, err, None),
        }
    }

    fn transaction_for(&self, from: Address, call: ActionCall) -> TransactionRequest {
        match call {
            ActionCall::Transfer { to, value } => TransactionRequest {
                from,
                to,
                value,
                data: Vec::new(),
            },
            ActionCall::Contract(call) => self.contract.transaction(from, call),
        }
    }

    fn success_detail(&self, action: &Action) -> String {
        match action {
            Action::SendValue {
                recipient, amount, ..
            } => format!(
                "Successfully sent {amount} {} to {recipient}",
                self.value_symbol
            ),
            Action::FreezeAccount { target } => format!("Account {target} has been frozen."),
            Action::UnfreezeAccount { target } => format!("Account {target} has been unfrozen."),
            Action::TransferOwnership { new_owner } => {
                format!("Ownership transferred to {new_owner}")
            }
            Action::PauseContract => "Contract has been paused.".to_string(),
            Action::ResumeContract => "Contract has been resumed.".to_string(),
            Action::UpdateFraudThreshold { value } => {
                format!("Fraud detection threshold updated to {value}")
            }
            Action::UpdatePenaltyAmount { value } => format!("Penalty amount updated to {value}"),
            Action::CheckFrozenStatus { .. } | Action::ListUserTransactions { .. } => {
                String::new()
            }
        }
    }

    async fn submit(&self, session: &Session, action: &Action, call: ActionCall) -> ActionOutcome {
        let kind = action.kind();
        let tx = self.transaction_for(session.address(), call);
        tracing::debug!(
            action = %kind,
            from = %tx.from,
            to = %tx.to,
            value = %units::format_units(tx.value, self.value_decimals),
            "submitting transaction"
        );

        let pending = match session.signer().send(tx).await {
            Ok(pending) => pending,
            Err(err) => return ActionOutcome::from_provider_error(kind, err, None),
        };
        let tx_hash = pending.hash().clone();

        match pending.wait().await {
            Ok(receipt) => {
                let detail = self.success_detail(action);
                let mut outcome = ActionOutcome::success(kind, detail, Some(receipt.tx_hash));
                outcome.requires_reconnect = kind == ActionKind::TransferOwnership;
                outcome
            }
            Err(err) => ActionOutcome::from_provider_error(kind, err, Some(tx_hash)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::contract::{UserTransaction, abi};
    use crate::session::{Role, SessionEstablisher};
    use crate::wallet::{MemoryProvider, WalletProvider};

    const CONTRACT: &str = "0x052d5d86568bef96eafa3b0a049bc4dc11d10b93";
    const OWNER: &str = "0x1111111111111111111111111111111111111111";
    const USER: &str = "0x2222222222222222222222222222222222222222";
    const TARGET: &str = "0xABC0000000000000000000000000000000000abc";

    fn contract() -> TokenContract {
        TokenContract::new(Address::parse(CONTRACT).unwrap())
    }

    fn gateway() -> ActionGateway {
        ActionGateway::new(contract(), 18, "ETH")
    }

    async fn connect_as(account: &str) -> (Arc<MemoryProvider>, Session) {
        let provider = Arc::new(MemoryProvider::new(
            contract().address(),
            Address::parse(account).unwrap(),
            Address::parse(OWNER).unwrap(),
        ));
        let session = SessionEstablisher::new(
            Some(Arc::clone(&provider) as Arc<dyn WalletProvider>),
            contract(),
        )
        .connect()
        .await
        .unwrap();
        provider.reset_calls().await;
        (provider, session)
    }

    #[tokio::test]
    async fn owner_freeze_succeeds_and_mentions_target() {
        let (provider, session) = connect_as(OWNER).await;
        assert_eq!(session.role(), Role::Owner);

        let request = ActionRequest::new(ActionKind::FreezeAccount).with_param("target", TARGET);
        let outcome = gateway().execute(&session, &request).await.unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(outcome.detail.contains(&TARGET.to_ascii_lowercase()));
        assert!(outcome.tx_hash.is_some());
        assert!(provider.is_frozen(Address::parse(TARGET).unwrap()).await);
    }

    #[tokio::test]
    async fn user_pause_is_unauthorized_without_calls() {
        let (provider, session) = connect_as(USER).await;
        let err = gateway()
            .execute(&session, &ActionRequest::new(ActionKind::PauseContract))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(provider.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn validation_precedes_authorization() {
        let (provider, session) = connect_as(USER).await;
        let err = gateway()
            .execute(&session, &ActionRequest::new(ActionKind::FreezeAccount))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(provider.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn declined_signature_is_rejected_not_failed() {
        let (provider, session) = connect_as(OWNER).await;
        provider.reject_next_signature().await;
        let outcome = gateway()
            .execute(&session, &ActionRequest::new(ActionKind::ResumeContract))
            .await
            .unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Rejected);
        assert_eq!(outcome.error_kind, Some(ErrorKind::UserRejected));
        assert_eq!(provider.calls().await.wait_for_confirmation, 0);
    }

    #[tokio::test]
    async fn submission_failure_keeps_message_verbatim() {
        let (provider, session) = connect_as(OWNER).await;
        provider.fail_next_send("gas required exceeds allowance (0)").await;
        let request =
            ActionRequest::new(ActionKind::UpdatePenaltyAmount).with_param("value", "900");
        let outcome = gateway().execute(&session, &request).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.detail, "gas required exceeds allowance (0)");
        assert_eq!(provider.penalty_amount().await, 500);
    }

    #[tokio::test]
    async fn stale_owner_session_fails_on_chain() {
        let (provider, session) = connect_as(OWNER).await;
        provider.set_owner(Address::parse(USER).unwrap()).await;

        let outcome = gateway()
            .execute(&session, &ActionRequest::new(ActionKind::PauseContract))
            .await
            .unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.detail.contains("caller is not the owner"));
        assert!(outcome.tx_hash.is_some());
        assert!(!provider.is_paused().await);
    }

    #[tokio::test]
    async fn transfer_ownership_requires_reconnect() {
        let (provider, session) = connect_as(OWNER).await;
        let request =
            ActionRequest::new(ActionKind::TransferOwnership).with_param("newOwner", USER);
        let outcome = gateway().execute(&session, &request).await.unwrap();
        assert!(outcome.is_success());
        assert!(outcome.requires_reconnect);
        assert_eq!(outcome.detail, format!("Ownership transferred to {USER}"));
        assert_eq!(provider.owner().await, Address::parse(USER).unwrap());
        // The session itself is unchanged; only a new connect reclassifies.
        assert_eq!(session.role(), Role::Owner);
    }

    #[tokio::test]
    async fn reads_use_no_signature() {
        let (provider, session) = connect_as(USER).await;
        let request =
            ActionRequest::new(ActionKind::CheckFrozenStatus).with_param("account", TARGET);
        let outcome = gateway().execute(&session, &request).await.unwrap();
        assert!(outcome.is_success());
        assert!(outcome.detail.ends_with("is active."));
        assert!(outcome.tx_hash.is_none());

        let calls = provider.calls().await;
        assert_eq!(calls.call, 1);
        assert_eq!(calls.send_transaction, 0);
    }

    #[tokio::test]
    async fn contract_paused_reads_fresh_state() {
        let (provider, session) = connect_as(USER).await;
        let gateway = gateway();
        assert!(!gateway.contract_paused(&session).await.unwrap());
        provider.set_owner(Address::parse(USER).unwrap()).await;
        let outcome = gateway
            .execute(&session, &ActionRequest::new(ActionKind::PauseContract))
            .await;
        // Role is fixed at connect time: still a User session.
        assert!(outcome.is_err());
        assert!(!gateway.contract_paused(&session).await.unwrap());
    }

    #[tokio::test]
    async fn listing_renders_hash_and_timestamp_per_entry() {
        let user = Address::parse(USER).unwrap();
        let entries = vec![
            UserTransaction {
                transaction_hash: [0x0a; abi::WORD_LEN],
                timestamp: 1_700_000_000,
            },
            UserTransaction {
                transaction_hash: [0x0b; abi::WORD_LEN],
                timestamp: 1_700_000_600,
            },
        ];
        let provider = Arc::new(
            MemoryProvider::new(contract().address(), user, Address::parse(OWNER).unwrap())
                .with_user_transactions(user, entries.clone()),
        );
        let session = SessionEstablisher::new(
            Some(Arc::clone(&provider) as Arc<dyn WalletProvider>),
            contract(),
        )
        .connect()
        .await
        .unwrap();

        let outcome = gateway()
            .execute(&session, &ActionRequest::new(ActionKind::ListUserTransactions))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            outcome.detail,
            format!(
                "2 transaction(s) for {USER}\n  0x{} - 1700000000\n  0x{} - 1700000600",
                "0a".repeat(32),
                "0b".repeat(32)
            )
        );

        let other =
            ActionRequest::new(ActionKind::ListUserTransactions).with_param("account", OWNER);
        let outcome = gateway().execute(&session, &other).await.unwrap();
        assert_eq!(outcome.detail, format!("0 transaction(s) for {OWNER}"));
    }
}
