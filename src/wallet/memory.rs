//! In-process wallet and contract simulation.
//!
//! Backs `--dry-run` and the test suite. Implements the same method set as
//! the deployed contract by decoding calldata, applies state changes at
//! submission, and reports reverts at confirmation the way a node does.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CallRequest, Receipt, TransactionRequest, TxHash, WalletProvider};
use crate::contract::abi::{self, Address};
use crate::contract::{ContractCall, UserTransaction};
use crate::error::ProviderError;

pub const DEFAULT_FRAUD_THRESHOLD: u128 = 1000;
pub const DEFAULT_PENALTY_AMOUNT: u128 = 500;
/// 100 ether.
pub const DEFAULT_BALANCE: u128 = 100_000_000_000_000_000_000;
/// Timestamp of block zero; each later block is `BLOCK_TIME_SECS` after it.
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
pub const BLOCK_TIME_SECS: u64 = 12;

/// EIP-1193 "requested account has not been authorized".
const UNAUTHORIZED_ACCOUNT_CODE: i64 = 4100;
const EXECUTION_ERROR_CODE: i64 = -32000;

/// Number of times each provider operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub request_accounts: usize,
    pub signer: usize,
    pub call: usize,
    pub send_transaction: usize,
    pub wait_for_confirmation: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.request_accounts
            + self.signer
            + self.call
            + self.send_transaction
            + self.wait_for_confirmation
    }
}

#[derive(Debug)]
struct ContractState {
    owner: Address,
    frozen: BTreeSet<Address>,
    paused: bool,
    fraud_threshold: u128,
    penalty_amount: u128,
    transactions: BTreeMap<Address, Vec<UserTransaction>>,
    balances: BTreeMap<Address, u128>,
}

#[derive(Debug, Default)]
struct Script {
    deny_connection: bool,
    reject_next_signature: bool,
    fail_next_send: Option<String>,
    hold_confirmations: bool,
}

#[derive(Debug)]
struct Inner {
    state: ContractState,
    script: Script,
    counts: CallCounts,
    receipts: BTreeMap<TxHash, Result<Receipt, ProviderError>>,
    nonce: u64,
    block: u64,
}

#[derive(Debug)]
pub struct MemoryProvider {
    contract: Address,
    account: Address,
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    /// Provider connected as `account`, against a contract owned by `owner`.
    pub fn new(contract: Address, account: Address, owner: Address) -> Self {
        let mut balances = BTreeMap::new();
        balances.insert(account, DEFAULT_BALANCE);
        Self {
            contract,
            account,
            inner: Mutex::new(Inner {
                state: ContractState {
                    owner,
                    frozen: BTreeSet::new(),
                    paused: false,
                    fraud_threshold: DEFAULT_FRAUD_THRESHOLD,
                    penalty_amount: DEFAULT_PENALTY_AMOUNT,
                    transactions: BTreeMap::new(),
                    balances,
                },
                script: Script::default(),
                counts: CallCounts::default(),
                receipts: BTreeMap::new(),
                nonce: 0,
                block: 0,
            }),
        }
    }

    pub fn with_balance(mut self, account: Address, wei: u128) -> Self {
        self.inner.get_mut().state.balances.insert(account, wei);
        self
    }

    pub fn with_user_transactions(
        mut self,
        account: Address,
        entries: Vec<UserTransaction>,
    ) -> Self {
        self.inner
            .get_mut()
            .state
            .transactions
            .insert(account, entries);
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.inner.get_mut().state.paused = paused;
        self
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Decline the next connection prompt and every later one.
    pub async fn deny_connection(&self) {
        self.inner.lock().await.script.deny_connection = true;
    }

    /// Decline the next signature prompt.
    pub async fn reject_next_signature(&self) {
        self.inner.lock().await.script.reject_next_signature = true;
    }

    /// Fail the next submission with `message`.
    pub async fn fail_next_send(&self, message: impl Into<String>) {
        self.inner.lock().await.script.fail_next_send = Some(message.into());
    }

    /// Never confirm any transaction from now on.
    pub async fn hold_confirmations(&self) {
        self.inner.lock().await.script.hold_confirmations = true;
    }

    /// Change the owner out of band.
    pub async fn set_owner(&self, owner: Address) {
        self.inner.lock().await.state.owner = owner;
    }

    pub async fn calls(&self) -> CallCounts {
        self.inner.lock().await.counts
    }

    pub async fn reset_calls(&self) {
        self.inner.lock().await.counts = CallCounts::default();
    }

    pub async fn owner(&self) -> Address {
        self.inner.lock().await.state.owner
    }

    pub async fn is_frozen(&self, account: Address) -> bool {
        self.inner.lock().await.state.frozen.contains(&account)
    }

    pub async fn is_paused(&self) -> bool {
        self.inner.lock().await.state.paused
    }

    pub async fn fraud_threshold(&self) -> u128 {
        self.inner.lock().await.state.fraud_threshold
    }

    pub async fn penalty_amount(&self) -> u128 {
        self.inner.lock().await.state.penalty_amount
    }

    pub async fn balance(&self, account: Address) -> u128 {
        self.inner
            .lock()
            .await
            .state
            .balances
            .get(&account)
            .copied()
            .unwrap_or(0)
    }

    fn apply(&self, state: &mut ContractState, tx: &TransactionRequest) -> Result<(), String> {
        if tx.data.is_empty() {
            return Ok(());
        }
        if tx.to != self.contract {
            return Ok(());
        }
        if tx.value != 0 {
            return Err("function is not payable".to_string());
        }
        let call = ContractCall::decode(&tx.data).map_err(|e| e.to_string())?;
        if call.method().is_read_only() {
            return Ok(());
        }
        if tx.from != state.owner {
            return Err("caller is not the owner".to_string());
        }

        match call {
            ContractCall::FreezeAccount(account) => {
                state.frozen.insert(account);
            }
            ContractCall::UnfreezeAccount(account) => {
                state.frozen.remove(&account);
            }
            ContractCall::TransferOwnership(new_owner) => {
                if new_owner.is_zero() {
                    return Err("new owner is the zero address".to_string());
                }
                state.owner = new_owner;
            }
            ContractCall::PauseContract => state.paused = true,
            ContractCall::ResumeContract => state.paused = false,
            ContractCall::UpdateFraudDetectionThreshold(value) => state.fraud_threshold = value,
            ContractCall::UpdatePenaltyAmount(value) => state.penalty_amount = value,
            ContractCall::Owner
            | ContractCall::IsAccountFrozen(_)
            | ContractCall::IsPaused
            | ContractCall::GetUserTransactions(_) => {}
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut inner = self.inner.lock().await;
        inner.counts.request_accounts += 1;
        if inner.script.deny_connection {
            return Err(ProviderError::user_rejected());
        }
        Ok(vec![self.account])
    }

    async fn signer(&self) -> Result<Address, ProviderError> {
        let mut inner = self.inner.lock().await;
        inner.counts.signer += 1;
        if inner.script.deny_connection {
            return Err(ProviderError::user_rejected());
        }
        Ok(self.account)
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        let mut inner = self.inner.lock().await;
        inner.counts.call += 1;
        if request.to != self.contract {
            return Ok(Vec::new());
        }
        let call = ContractCall::decode(&request.data)
            .map_err(|e| ProviderError::new(Some(EXECUTION_ERROR_CODE), e.to_string()))?;
        let state = &inner.state;
        let data = match call {
            ContractCall::Owner => state.owner.to_word().to_vec(),
            ContractCall::IsAccountFrozen(account) => {
                abi::uint_word(u128::from(state.frozen.contains(&account))).to_vec()
            }
            ContractCall::IsPaused => abi::uint_word(u128::from(state.paused)).to_vec(),
            ContractCall::GetUserTransactions(account) => {
                let records: Vec<[abi::Word; 2]> = state
                    .transactions
                    .get(&account)
                    .map(|entries| {
                        entries.iter().map(UserTransaction::to_words).collect()
                    })
                    .unwrap_or_default();
                abi::encode_tuple_array(&records)
            }
            _ => Vec::new(),
        };
        Ok(data)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, ProviderError> {
        let mut inner = self.inner.lock().await;
        inner.counts.send_transaction += 1;

        if std::mem::take(&mut inner.script.reject_next_signature) {
            return Err(ProviderError::new(
                Some(crate::error::USER_REJECTED_CODE),
                "User denied transaction signature.",
            ));
        }
        if let Some(message) = inner.script.fail_next_send.take() {
            return Err(ProviderError::new(Some(EXECUTION_ERROR_CODE), message));
        }
        if tx.from != self.account {
            return Err(ProviderError::new(
                Some(UNAUTHORIZED_ACCOUNT_CODE),
                "The requested account has not been authorized by the user.",
            ));
        }

        let balance = inner.state.balances.get(&tx.from).copied().unwrap_or(0);
        if tx.value > balance {
            return Err(ProviderError::new(
                Some(EXECUTION_ERROR_CODE),
                "insufficient funds for transfer",
            ));
        }

        inner.nonce += 1;
        inner.block += 1;
        let hash_word = abi::uint_word(u128::from(inner.nonce));
        let tx_hash = TxHash::new(abi::encode_hex_prefixed(&hash_word));
        let block_number = inner.block;

        let outcome = self.apply(&mut inner.state, tx);
        if outcome.is_ok() && tx.value > 0 {
            let state = &mut inner.state;
            state.balances.insert(tx.from, balance - tx.value);
            *state.balances.entry(tx.to).or_insert(0) += tx.value;
            if tx.data.is_empty() {
                state
                    .transactions
                    .entry(tx.from)
                    .or_default()
                    .push(UserTransaction {
                        transaction_hash: hash_word,
                        timestamp: GENESIS_TIMESTAMP + block_number * BLOCK_TIME_SECS,
                    });
            }
        }
        let receipt = outcome
            .map(|()| Receipt {
                tx_hash: tx_hash.clone(),
                block_number: Some(block_number),
            })
            .map_err(|reason| {
                ProviderError::new(
                    Some(EXECUTION_ERROR_CODE),
                    format!("execution reverted: {reason}"),
                )
            });
        inner.receipts.insert(tx_hash.clone(), receipt);
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, hash: &TxHash) -> Result<Receipt, ProviderError> {
        let receipt = {
            let mut inner = self.inner.lock().await;
            inner.counts.wait_for_confirmation += 1;
            if inner.script.hold_confirmations {
                None
            } else {
                Some(inner.receipts.get(hash).cloned())
            }
        };
        match receipt {
            None => std::future::pending().await,
            Some(Some(receipt)) => receipt,
            Some(None) => Err(ProviderError::transport(format!(
                "transaction {hash} not found"
            ))),
        }
    }
}
