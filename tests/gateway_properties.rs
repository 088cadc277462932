//! End-to-end checks of session classification and the action lifecycle
//! against the in-memory contract.
//!
//! Every test connects through `SessionEstablisher`, so the role under test
//! is always the one derived from the contract's reported owner.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use tokenguard::contract::{Address, TokenContract};
use tokenguard::error::{ActionError, ErrorKind};
use tokenguard::gateway::{ActionGateway, ActionKind, ActionRequest, OutcomeStatus, RequiredRole};
use tokenguard::session::{Role, Session, SessionEstablisher};
use tokenguard::units::{NATIVE_DECIMALS, parse_units};
use tokenguard::wallet::{BLOCK_TIME_SECS, GENESIS_TIMESTAMP, MemoryProvider, WalletProvider};

const CONTRACT: &str = "0x052d5d86568bef96eafa3b0a049bc4dc11d10b93";
const OWNER: &str = "0x00000000000000000000000000000000000000aa";
const USER: &str = "0x00000000000000000000000000000000000000bb";
const TARGET: &str = "0xABC0000000000000000000000000000000000DEF";

const WEI: u128 = 1_000_000_000_000_000_000;

fn addr(raw: &str) -> Address {
    Address::parse(raw).unwrap()
}

fn contract() -> TokenContract {
    TokenContract::new(addr(CONTRACT))
}

fn gateway() -> ActionGateway {
    ActionGateway::new(contract(), NATIVE_DECIMALS, "ETH")
}

async fn connect(provider: &Arc<MemoryProvider>) -> Session {
    SessionEstablisher::new(
        Some(Arc::clone(provider) as Arc<dyn WalletProvider>),
        contract(),
    )
    .connect()
    .await
    .unwrap()
}

async fn connect_as(account: &str) -> (Arc<MemoryProvider>, Session) {
    let provider = Arc::new(MemoryProvider::new(
        addr(CONTRACT),
        addr(account),
        addr(OWNER),
    ));
    let session = connect(&provider).await;
    (provider, session)
}

/// A request with every required parameter filled in.
fn valid_request(kind: ActionKind) -> ActionRequest {
    let request = ActionRequest::new(kind);
    match kind {
        ActionKind::SendValue => request
            .with_param("recipient", TARGET)
            .with_param("amount", "0.25"),
        ActionKind::CheckFrozenStatus => request.with_param("account", TARGET),
        ActionKind::ListUserTransactions => request,
        ActionKind::FreezeAccount | ActionKind::UnfreezeAccount => {
            request.with_param("target", TARGET)
        }
        ActionKind::TransferOwnership => request.with_param("newOwner", TARGET),
        ActionKind::PauseContract | ActionKind::ResumeContract => request,
        ActionKind::UpdateFraudThreshold | ActionKind::UpdatePenaltyAmount => {
            request.with_param("value", "42")
        }
    }
}

#[tokio::test]
async fn role_is_owner_iff_address_matches_owner_in_any_case() {
    for (account, expected) in [
        (OWNER, Role::Owner),
        ("0x00000000000000000000000000000000000000AA", Role::Owner),
        (USER, Role::User),
        (TARGET, Role::User),
    ] {
        let (_, session) = connect_as(account).await;
        assert_eq!(session.role(), expected, "account {account}");
    }
}

#[tokio::test]
async fn owner_actions_from_user_session_make_no_calls() {
    let (provider, session) = connect_as(USER).await;
    let gateway = gateway();

    let owner_only: Vec<_> = ActionKind::ALL
        .into_iter()
        .filter(|kind| kind.required_role() == RequiredRole::Owner)
        .collect();
    assert_eq!(owner_only.len(), 7);

    for kind in owner_only {
        provider.reset_calls().await;
        let err = gateway
            .execute(&session, &valid_request(kind))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ActionError::Unauthorized { .. }),
            "{kind}: {err}"
        );
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(provider.calls().await.total(), 0, "{kind} reached the provider");
    }
}

#[tokio::test]
async fn missing_required_params_make_no_calls() {
    let (provider, session) = connect_as(OWNER).await;
    let gateway = gateway();

    for kind in ActionKind::ALL {
        for missing in kind.required_params() {
            let mut request = valid_request(kind);
            request.params.remove(*missing);
            provider.reset_calls().await;

            let err = gateway.execute(&session, &request).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{kind} without {missing}");
            assert_eq!(provider.calls().await.total(), 0);
        }
    }
}

#[tokio::test]
async fn blank_params_count_as_missing() {
    let (provider, session) = connect_as(OWNER).await;
    provider.reset_calls().await;
    let request = ActionRequest::new(ActionKind::FreezeAccount).with_param("target", "   ");
    let err = gateway().execute(&session, &request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(provider.calls().await.total(), 0);
}

#[test]
fn decimal_amounts_convert_exactly() {
    let first = parse_units("1.5", NATIVE_DECIMALS).unwrap();
    for _ in 0..10 {
        assert_eq!(parse_units("1.5", NATIVE_DECIMALS).unwrap(), first);
    }
    assert_eq!(first, WEI + WEI / 2);
    assert_eq!(tokenguard::units::format_units(first, NATIVE_DECIMALS), "1.5");

    let sum = parse_units("0.1", NATIVE_DECIMALS).unwrap()
        + parse_units("0.2", NATIVE_DECIMALS).unwrap();
    assert_eq!(sum, parse_units("0.3", NATIVE_DECIMALS).unwrap());
}

#[tokio::test]
async fn declined_signature_is_rejected_and_other_failures_are_failed() {
    let (provider, session) = connect_as(OWNER).await;
    let gateway = gateway();

    provider.reject_next_signature().await;
    let rejected = gateway
        .execute(&session, &valid_request(ActionKind::PauseContract))
        .await
        .unwrap();
    assert_eq!(rejected.status, OutcomeStatus::Rejected);
    assert_eq!(rejected.error_kind, Some(ErrorKind::UserRejected));
    assert!(rejected.tx_hash.is_none());
    assert!(!provider.is_paused().await);

    provider.fail_next_send("nonce too low").await;
    let failed = gateway
        .execute(&session, &valid_request(ActionKind::PauseContract))
        .await
        .unwrap();
    assert_eq!(failed.status, OutcomeStatus::Failed);
    assert_eq!(failed.error_kind, Some(ErrorKind::Failed));
    assert_eq!(failed.detail, "nonce too low");
}

#[tokio::test]
async fn owner_freeze_succeeds_and_check_reports_frozen() {
    let (provider, session) = connect_as(OWNER).await;
    let gateway = gateway();

    let outcome = gateway
        .execute(&session, &valid_request(ActionKind::FreezeAccount))
        .await
        .unwrap();
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert!(outcome.detail.contains(&addr(TARGET).to_string()));
    assert!(outcome.tx_hash.is_some());
    assert!(provider.is_frozen(addr(TARGET)).await);

    let check = gateway
        .execute(&session, &valid_request(ActionKind::CheckFrozenStatus))
        .await
        .unwrap();
    assert_eq!(
        check.detail,
        format!("Account {} is frozen.", addr(TARGET))
    );

    let outcome = gateway
        .execute(&session, &valid_request(ActionKind::UnfreezeAccount))
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert!(!provider.is_frozen(addr(TARGET)).await);
}

#[tokio::test]
async fn user_pause_is_unauthorized_before_submission() {
    let (provider, session) = connect_as(USER).await;
    provider.reset_calls().await;

    let err = gateway()
        .execute(&session, &ActionRequest::new(ActionKind::PauseContract))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(provider.calls().await.send_transaction, 0);
    assert!(!provider.is_paused().await);
}

#[tokio::test]
async fn connect_without_provider_is_unavailable() {
    let err = SessionEstablisher::new(None, contract())
        .connect()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert!(!err.kind().retryable());
}

#[tokio::test]
async fn user_send_is_recorded_and_listed() {
    let (provider, session) = connect_as(USER).await;
    let gateway = gateway();

    let outcome = gateway
        .execute(&session, &valid_request(ActionKind::SendValue))
        .await
        .unwrap();
    assert_eq!(
        outcome.detail,
        format!("Successfully sent 0.25 ETH to {}", addr(TARGET))
    );
    assert_eq!(provider.balance(addr(TARGET)).await, WEI / 4);
    let hash = outcome.tx_hash.unwrap();

    let listed = gateway
        .execute(&session, &valid_request(ActionKind::ListUserTransactions))
        .await
        .unwrap();
    assert_eq!(
        listed.detail,
        format!(
            "1 transaction(s) for {}\n  {} - {}",
            addr(USER),
            hash,
            GENESIS_TIMESTAMP + BLOCK_TIME_SECS
        )
    );
}

#[tokio::test]
async fn paused_contract_is_reported_to_every_role() {
    for account in [OWNER, USER] {
        let provider = Arc::new(
            MemoryProvider::new(addr(CONTRACT), addr(account), addr(OWNER)).with_paused(true),
        );
        let session = connect(&provider).await;
        assert!(gateway().contract_paused(&session).await.unwrap(), "{account}");
    }
}

#[tokio::test]
async fn owner_updates_thresholds_and_pause_flag() {
    let (provider, session) = connect_as(OWNER).await;
    let gateway = gateway();

    for kind in [ActionKind::UpdateFraudThreshold, ActionKind::UpdatePenaltyAmount] {
        let outcome = gateway.execute(&session, &valid_request(kind)).await.unwrap();
        assert!(outcome.is_success(), "{kind}: {}", outcome.detail);
    }
    assert_eq!(provider.fraud_threshold().await, 42);
    assert_eq!(provider.penalty_amount().await, 42);

    gateway
        .execute(&session, &valid_request(ActionKind::PauseContract))
        .await
        .unwrap();
    assert!(gateway.contract_paused(&session).await.unwrap());

    gateway
        .execute(&session, &valid_request(ActionKind::ResumeContract))
        .await
        .unwrap();
    assert!(!gateway.contract_paused(&session).await.unwrap());
}

#[tokio::test]
async fn ownership_transfer_leaves_session_stale_until_reconnect() {
    let (provider, session) = connect_as(OWNER).await;
    let gateway = gateway();

    let outcome = gateway
        .execute(&session, &valid_request(ActionKind::TransferOwnership))
        .await
        .unwrap();
    assert!(outcome.requires_reconnect);
    assert_eq!(session.role(), Role::Owner);

    // The stale session still passes the role check but the chain refuses it.
    let stale = gateway
        .execute(&session, &valid_request(ActionKind::PauseContract))
        .await
        .unwrap();
    assert_eq!(stale.status, OutcomeStatus::Failed);
    assert!(stale.detail.contains("caller is not the owner"));
    assert!(stale.tx_hash.is_some());

    let fresh = connect(&provider).await;
    assert_eq!(fresh.role(), Role::User);
}

#[tokio::test]
async fn unconfirmed_submission_never_resolves_on_its_own() {
    let (provider, session) = connect_as(OWNER).await;
    provider.hold_confirmations().await;
    let gateway = gateway();
    let request = valid_request(ActionKind::PauseContract);

    let waited = tokio::time::timeout(
        Duration::from_millis(50),
        gateway.execute(&session, &request),
    )
    .await;
    assert!(waited.is_err());
    assert_eq!(provider.calls().await.wait_for_confirmation, 1);
}
