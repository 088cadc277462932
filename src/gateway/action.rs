//! Action kinds, their privilege and parameter tables, and validation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::contract::{Address, ContractCall};
use crate::error::ActionError;
use crate::session::Role;
use crate::units;

/// Role an action requires.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequiredRole {
    Any,
    Owner,
}

impl RequiredRole {
    pub fn permits(self, role: Role) -> bool {
        match self {
            Self::Any => true,
            Self::Owner => role == Role::Owner,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Owner => "owner",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    SendValue,
    CheckFrozenStatus,
    ListUserTransactions,
    FreezeAccount,
    UnfreezeAccount,
    TransferOwnership,
    PauseContract,
    ResumeContract,
    UpdateFraudThreshold,
    UpdatePenaltyAmount,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        Self::SendValue,
        Self::CheckFrozenStatus,
        Self::ListUserTransactions,
        Self::FreezeAccount,
        Self::UnfreezeAccount,
        Self::TransferOwnership,
        Self::PauseContract,
        Self::ResumeContract,
        Self::UpdateFraudThreshold,
        Self::UpdatePenaltyAmount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SendValue => "sendValue",
            Self::CheckFrozenStatus => "checkFrozenStatus",
            Self::ListUserTransactions => "listUserTransactions",
            Self::FreezeAccount => "freezeAccount",
            Self::UnfreezeAccount => "unfreezeAccount",
            Self::TransferOwnership => "transferOwnership",
            Self::PauseContract => "pauseContract",
            Self::ResumeContract => "resumeContract",
            Self::UpdateFraudThreshold => "updateFraudThreshold",
            Self::UpdatePenaltyAmount => "updatePenaltyAmount",
        }
    }

    pub fn required_role(self) -> RequiredRole {
        match self {
            Self::SendValue | Self::CheckFrozenStatus | Self::ListUserTransactions => {
                RequiredRole::Any
            }
            Self::FreezeAccount
            | Self::UnfreezeAccount
            | Self::TransferOwnership
            | Self::PauseContract
            | Self::ResumeContract
            | Self::UpdateFraudThreshold
            | Self::UpdatePenaltyAmount => RequiredRole::Owner,
        }
    }

    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::SendValue => &["recipient", "amount"],
            Self::CheckFrozenStatus => &["account"],
            Self::ListUserTransactions => &[],
            Self::FreezeAccount | Self::UnfreezeAccount => &["target"],
            Self::TransferOwnership => &["newOwner"],
            Self::PauseContract | Self::ResumeContract => &[],
            Self::UpdateFraudThreshold | Self::UpdatePenaltyAmount => &["value"],
        }
    }

    pub fn optional_params(self) -> &'static [&'static str] {
        match self {
            Self::ListUserTransactions => &["account"],
            _ => &[],
        }
    }

    /// Read-only actions go through the non-signing handle.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::CheckFrozenStatus | Self::ListUserTransactions)
    }

    /// Kinds a session with `role` may execute.
    pub fn permitted_for(role: Role) -> impl Iterator<Item = ActionKind> {
        Self::ALL
            .into_iter()
            .filter(move |kind| kind.required_role().permits(role))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    /// Accepts the camelCase name in any case, with `-` or `_` separators,
    /// plus the console's historical labels (`sendEth`,
    /// `updateFraudDetectionThreshold`, `getUserTransactions`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "sendeth" => return Ok(Self::SendValue),
            "updatefrauddetectionthreshold" => return Ok(Self::UpdateFraudThreshold),
            "getusertransactions" => return Ok(Self::ListUserTransactions),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| ActionError::InvalidInput(format!("unknown action '{}'", raw.trim())))
    }
}

/// A command as collected from the operator: a kind plus named string
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub params: BTreeMap<String, String>,
}

impl ActionRequest {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Build from `name=value` pairs.
    pub fn from_pairs<I, S>(kind: ActionKind, pairs: I) -> Result<Self, ActionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::new(kind);
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                ActionError::InvalidInput(format!("parameter '{pair}' must be name=value"))
            })?;
            request.params.insert(name.trim().to_string(), value.to_string());
        }
        Ok(request)
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str, ActionError> {
        self.param(name).ok_or_else(|| {
            ActionError::InvalidInput(format!("{} requires '{}'", self.kind, name))
        })
    }

    fn address(&self, name: &str) -> Result<Address, ActionError> {
        let raw = self.required(name)?;
        Address::parse(raw).map_err(|e| ActionError::InvalidInput(format!("{name}: {e}")))
    }

    fn optional_address(&self, name: &str) -> Result<Option<Address>, ActionError> {
        self.param(name)
            .map(|raw| {
                Address::parse(raw).map_err(|e| ActionError::InvalidInput(format!("{name}: {e}")))
            })
            .transpose()
    }

    fn uint(&self, name: &str) -> Result<u128, ActionError> {
        let raw = self.required(name)?;
        units::parse_units(raw, 0).map_err(|e| ActionError::InvalidInput(format!("{name}: {e}")))
    }
}

/// On-chain shape of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCall {
    /// Native value transfer between accounts; not a contract method.
    Transfer { to: Address, value: u128 },
    Contract(ContractCall),
}

/// A request whose parameters have been checked and typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendValue {
        recipient: Address,
        amount: String,
        base_units: u128,
    },
    CheckFrozenStatus {
        account: Address,
    },
    ListUserTransactions {
        account: Option<Address>,
    },
    FreezeAccount {
        target: Address,
    },
    UnfreezeAccount {
        target: Address,
    },
    TransferOwnership {
        new_owner: Address,
    },
    PauseContract,
    ResumeContract,
    UpdateFraudThreshold {
        value: u128,
    },
    UpdatePenaltyAmount {
        value: u128,
    },
}

impl Action {
    /// Check `request` against its kind's parameter table. `value_decimals`
    /// is the base-unit scale for value transfers.
    pub fn validate(request: &ActionRequest, value_decimals: u32) -> Result<Self, ActionError> {
        let kind = request.kind;
        if let Some(unknown) = request.params.keys().find(|name| {
            !kind.required_params().contains(&name.as_str())
                && !kind.optional_params().contains(&name.as_str())
        }) {
            return Err(ActionError::InvalidInput(format!(
                "{kind} does not take '{unknown}'"
            )));
        }

        let action = match kind {
            ActionKind::SendValue => {
                let recipient = request.address("recipient")?;
                let amount = request.required("amount")?;
                let base_units = units::parse_units(amount, value_decimals)
                    .map_err(|e| ActionError::InvalidInput(format!("amount: {e}")))?;
                if base_units == 0 {
                    return Err(ActionError::InvalidInput(
                        "amount must be greater than zero".to_string(),
                    ));
                }
                Self::SendValue {
                    recipient,
                    amount: units::format_units(base_units, value_decimals),
                    base_units,
                }
            }
            ActionKind::CheckFrozenStatus => Self::CheckFrozenStatus {
                account: request.address("account")?,
            },
            ActionKind::ListUserTransactions => Self::ListUserTransactions {
                account: request.optional_address("account")?,
            },
            ActionKind::FreezeAccount => Self::FreezeAccount {
                target: request.address("target")?,
            },
            ActionKind::UnfreezeAccount => Self::UnfreezeAccount {
                target: request.address("target")?,
            },
            ActionKind::TransferOwnership => {
                let new_owner = request.address("newOwner")?;
                if new_owner.is_zero() {
                    return Err(ActionError::InvalidInput(
                        "newOwner cannot be the zero address".to_string(),
                    ));
                }
                Self::TransferOwnership { new_owner }
            }
            ActionKind::PauseContract => Self::PauseContract,
            ActionKind::ResumeContract => Self::ResumeContract,
            ActionKind::UpdateFraudThreshold => Self::UpdateFraudThreshold {
                value: request.uint("value")?,
            },
            ActionKind::UpdatePenaltyAmount => Self::UpdatePenaltyAmount {
                value: request.uint("value")?,
            },
        };
        Ok(action)
    }

    /// What goes on chain for this action. `caller` fills in defaults that
    /// refer to the connected account.
    pub fn call(&self, caller: Address) -> ActionCall {
        let call = match *self {
            Self::SendValue {
                recipient,
                base_units,
                ..
            } => {
                return ActionCall::Transfer {
                    to: recipient,
                    value: base_units,
                };
            }
            Self::CheckFrozenStatus { account } => ContractCall::IsAccountFrozen(account),
            Self::ListUserTransactions { account } => {
                ContractCall::GetUserTransactions(account.unwrap_or(caller))
            }
            Self::FreezeAccount { target } => ContractCall::FreezeAccount(target),
            Self::UnfreezeAccount { target } => ContractCall::UnfreezeAccount(target),
            Self::TransferOwnership { new_owner } => ContractCall::TransferOwnership(new_owner),
            Self::PauseContract => ContractCall::PauseContract,
            Self::ResumeContract => ContractCall::ResumeContract,
            Self::UpdateFraudThreshold { value } => {
                ContractCall::UpdateFraudDetectionThreshold(value)
            }
            Self::UpdatePenaltyAmount { value } => ContractCall::UpdatePenaltyAmount(value),
        };
        ActionCall::Contract(call)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::SendValue { .. } => ActionKind::SendValue,
            Self::CheckFrozenStatus { .. } => ActionKind::CheckFrozenStatus,
            Self::ListUserTransactions { .. } => ActionKind::ListUserTransactions,
            Self::FreezeAccount { .. } => ActionKind::FreezeAccount,
            Self::UnfreezeAccount { .. } => ActionKind::UnfreezeAccount,
            Self::TransferOwnership { .. } => ActionKind::TransferOwnership,
            Self::PauseContract => ActionKind::PauseContract,
            Self::ResumeContract => ActionKind::ResumeContract,
            Self::UpdateFraudThreshold { .. } => ActionKind::UpdateFraudThreshold,
            Self::UpdatePenaltyAmount { .. } => ActionKind::UpdatePenaltyAmount,
        }
    }
}
