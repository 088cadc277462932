//! Console command handlers.
//!
//! The console is the presentation layer: it collects action parameters,
//! renders outcomes, and hides actions the session's role may not run. The
//! gateway enforces roles regardless of what is shown here.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::config::Config;
use crate::contract::TokenContract;
use crate::error::{ActionError, Error, ErrorKind, SessionError};
use crate::gateway::{ActionGateway, ActionKind, ActionOutcome, ActionRequest, OutcomeStatus};
use crate::session::{Session, SessionEstablisher};
use crate::wallet::WalletProvider;

/// What the console observed for one `exec`.
#[derive(Debug)]
pub enum ExecResult {
    Finished(ActionOutcome),
    /// Confirmation did not arrive within the configured timeout. The
    /// transaction may still confirm; nothing was cancelled.
    Pending { action: ActionKind, waited: Duration },
}

pub struct Console {
    establisher: SessionEstablisher,
    gateway: ActionGateway,
    confirmation_timeout: Option<Duration>,
}

impl Console {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, config: &Config) -> Self {
        let contract = TokenContract::new(config.contract.address);
        Self {
            establisher: SessionEstablisher::new(provider, contract),
            gateway: ActionGateway::new(
                contract,
                config.contract.value_decimals,
                config.contract.value_symbol.clone(),
            ),
            confirmation_timeout: config.confirmation_timeout,
        }
    }

    pub async fn connect(&self) -> Result<Session, SessionError> {
        self.establisher.connect().await
    }

    /// Execute `request`, giving up on the wait after the configured
    /// confirmation timeout.
    pub async fn exec(
        &self,
        session: &Session,
        request: &ActionRequest,
    ) -> Result<ExecResult, ActionError> {
        let execution = self.gateway.execute(session, request);
        match self.confirmation_timeout {
            None => execution.await.map(ExecResult::Finished),
            Some(limit) => match tokio::time::timeout(limit, execution).await {
                Ok(result) => result.map(ExecResult::Finished),
                Err(_) => {
                    tracing::warn!(action = %request.kind, "no confirmation after {:?}", limit);
                    Ok(ExecResult::Pending {
                        action: request.kind,
                        waited: limit,
                    })
                }
            },
        }
    }

    pub(super) async fn run_connect(&self, as_json: bool) -> anyhow::Result<ExitCode> {
        let session = match self.connect().await {
            Ok(session) => session,
            Err(e) => return Ok(report_error(&e.into(), as_json)),
        };

        if as_json {
            println!("{}", serde_json::to_string_pretty(&session_json(&session))?);
        } else {
            println!("Connected: {}", session.address());
            println!("Role:      {}", session.role());
        }
        Ok(ExitCode::SUCCESS)
    }

    pub(super) async fn run_status(&self, as_json: bool) -> anyhow::Result<ExitCode> {
        let session = match self.connect().await {
            Ok(session) => session,
            Err(e) => return Ok(report_error(&e.into(), as_json)),
        };
        let paused = self.gateway.contract_paused(&session).await;

        if as_json {
            let mut value = session_json(&session);
            value["contract"] = json!(self.gateway.contract().address());
            value["paused"] = match &paused {
                Ok(flag) => json!(flag),
                Err(e) => json!({ "error": e.message }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("tokenguard status");
            println!("=================\n");
            println!("  [pass] Wallet: {}", session.address());
            println!("  [pass] Role: {}", session.role());
            println!("  [pass] Contract: {}", self.gateway.contract().address());
            match &paused {
                Ok(true) => println!("  [pass] Paused: yes"),
                Ok(false) => println!("  [pass] Paused: no"),
                Err(e) => println!("  [FAIL] Paused: {}", e),
            }
        }

        Ok(if paused.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    pub(super) async fn run_exec(
        &self,
        action: &str,
        params: &[String],
        as_json: bool,
    ) -> anyhow::Result<ExitCode> {
        // Parse before connecting so a typo never prompts the wallet.
        let request = match action
            .parse::<ActionKind>()
            .and_then(|kind| ActionRequest::from_pairs(kind, params))
        {
            Ok(request) => request,
            Err(e) => return Ok(report_error(&e.into(), as_json)),
        };

        let session = match self.connect().await {
            Ok(session) => session,
            Err(e) => return Ok(report_error(&e.into(), as_json)),
        };

        match self.exec(&session, &request).await {
            Ok(ExecResult::Finished(outcome)) => {
                if as_json {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                } else {
                    println!("{}", render_outcome(&outcome));
                }
                Ok(if outcome.is_success() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
            Ok(ExecResult::Pending { action, waited }) => {
                if as_json {
                    let value = json!({
                        "action": action,
                        "status": "pending",
                        "detail": pending_detail(waited),
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                } else {
                    println!("[pending] {action}: {}", pending_detail(waited));
                }
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Ok(report_error(&e.into(), as_json)),
        }
    }

    pub(super) async fn run_actions(
        &self,
        connect: bool,
        as_json: bool,
    ) -> anyhow::Result<ExitCode> {
        let kinds: Vec<ActionKind> = if connect {
            match self.connect().await {
                Ok(session) => ActionKind::permitted_for(session.role()).collect(),
                Err(e) => return Ok(report_error(&e.into(), as_json)),
            }
        } else {
            ActionKind::ALL.to_vec()
        };

        if as_json {
            let list: Vec<_> = kinds.into_iter().map(action_json).collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        } else {
            for kind in kinds {
                println!("{}", render_action_line(kind));
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn action_json(kind: ActionKind) -> serde_json::Value {
    json!({
        "action": kind,
        "role": kind.required_role().as_str(),
        "read_only": kind.is_read_only(),
        "params": kind.required_params(),
        "optional": kind.optional_params(),
    })
}

fn session_json(session: &Session) -> serde_json::Value {
    json!({
        "address": session.address(),
        "role": session.role(),
        "connected_at": session.created_at().to_rfc3339(),
    })
}

fn pending_detail(waited: Duration) -> String {
    format!(
        "no confirmation after {}s; the transaction may still confirm",
        waited.as_secs()
    )
}

fn render_outcome(outcome: &ActionOutcome) -> String {
    let tag = match outcome.status {
        OutcomeStatus::Success => "ok",
        OutcomeStatus::Rejected => "rejected",
        OutcomeStatus::Failed => "failed",
    };
    let mut out = format!("[{tag}] {}: {}", outcome.action, outcome.detail);
    if let Some(hash) = &outcome.tx_hash {
        out.push_str(&format!("\n  tx: {hash}"));
    }
    if outcome.requires_reconnect {
        out.push_str("\n  Session role is stale; reconnect to continue.");
    }
    out
}

fn render_action_line(kind: ActionKind) -> String {
    let mut params: Vec<String> = kind
        .required_params()
        .iter()
        .map(|p| format!("{p}=..."))
        .collect();
    params.extend(kind.optional_params().iter().map(|p| format!("[{p}=...]")));
    let mode = if kind.is_read_only() { "read" } else { "write" };
    format!(
        "{:<22} {:<6} {:<6} {}",
        kind.name(),
        kind.required_role().as_str(),
        mode,
        params.join(" ")
    )
    .trim_end()
    .to_string()
}

fn error_json(err: &Error) -> serde_json::Value {
    json!({ "error": err.to_string(), "error_kind": err.kind() })
}

fn report_error(err: &Error, as_json: bool) -> ExitCode {
    if as_json {
        println!("{}", error_json(err));
        return ExitCode::FAILURE;
    }
    eprintln!("[FAIL] {err}");
    if matches!(err, Error::Session(_)) && err.kind().is_some_and(ErrorKind::retryable) {
        eprintln!("  Approve the request in your wallet and try again.");
    }
    ExitCode::FAILURE
}
