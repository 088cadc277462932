//! The deployed contract's fixed method set.
//!
//! Signatures must stay bit-exact: the selectors are derived from them.

use super::abi::{self, AbiError, Address, WORD_LEN, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractMethod {
    Owner,
    IsAccountFrozen,
    FreezeAccount,
    UnfreezeAccount,
    TransferOwnership,
    PauseContract,
    ResumeContract,
    IsPaused,
    GetUserTransactions,
    UpdateFraudDetectionThreshold,
    UpdatePenaltyAmount,
}

impl ContractMethod {
    pub const ALL: [ContractMethod; 11] = [
        Self::Owner,
        Self::IsAccountFrozen,
        Self::FreezeAccount,
        Self::UnfreezeAccount,
        Self::TransferOwnership,
        Self::PauseContract,
        Self::ResumeContract,
        Self::IsPaused,
        Self::GetUserTransactions,
        Self::UpdateFraudDetectionThreshold,
        Self::UpdatePenaltyAmount,
    ];

    pub fn signature(self) -> &'static str {
        match self {
            Self::Owner => "owner()",
            Self::IsAccountFrozen => "isAccountFrozen(address)",
            Self::FreezeAccount => "freezeAccount(address)",
            Self::UnfreezeAccount => "unfreezeAccount(address)",
            Self::TransferOwnership => "transferOwnership(address)",
            Self::PauseContract => "pauseContract()",
            Self::ResumeContract => "resumeContract()",
            Self::IsPaused => "isPaused()",
            Self::GetUserTransactions => "getUserTransactions(address)",
            Self::UpdateFraudDetectionThreshold => "updateFraudDetectionThreshold(uint256)",
            Self::UpdatePenaltyAmount => "updatePenaltyAmount(uint256)",
        }
    }

    /// Method name without the argument list.
    pub fn name(self) -> &'static str {
        let signature = self.signature();
        signature
            .split_once('(')
            .map(|(name, _)| name)
            .unwrap_or(signature)
    }

    pub fn selector(self) -> [u8; 4] {
        abi::selector(self.signature())
    }

    pub fn from_selector(selector: [u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.selector() == selector)
    }

    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Owner | Self::IsAccountFrozen | Self::IsPaused | Self::GetUserTransactions
        )
    }
}

impl std::fmt::Display for ContractMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One contract invocation with its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractCall {
    Owner,
    IsAccountFrozen(Address),
    FreezeAccount(Address),
    UnfreezeAccount(Address),
    TransferOwnership(Address),
    PauseContract,
    ResumeContract,
    IsPaused,
    GetUserTransactions(Address),
    UpdateFraudDetectionThreshold(u128),
    UpdatePenaltyAmount(u128),
}

impl ContractCall {
    pub fn method(&self) -> ContractMethod {
        match self {
            Self::Owner => ContractMethod::Owner,
            Self::IsAccountFrozen(_) => ContractMethod::IsAccountFrozen,
            Self::FreezeAccount(_) => ContractMethod::FreezeAccount,
            Self::UnfreezeAccount(_) => ContractMethod::UnfreezeAccount,
            Self::TransferOwnership(_) => ContractMethod::TransferOwnership,
            Self::PauseContract => ContractMethod::PauseContract,
            Self::ResumeContract => ContractMethod::ResumeContract,
            Self::IsPaused => ContractMethod::IsPaused,
            Self::GetUserTransactions(_) => ContractMethod::GetUserTransactions,
            Self::UpdateFraudDetectionThreshold(_) => ContractMethod::UpdateFraudDetectionThreshold,
            Self::UpdatePenaltyAmount(_) => ContractMethod::UpdatePenaltyAmount,
        }
    }

    fn args(&self) -> Vec<Word> {
        match self {
            Self::IsAccountFrozen(addr)
            | Self::FreezeAccount(addr)
            | Self::UnfreezeAccount(addr)
            | Self::TransferOwnership(addr)
            | Self::GetUserTransactions(addr) => vec![addr.to_word()],
            Self::UpdateFraudDetectionThreshold(value) | Self::UpdatePenaltyAmount(value) => {
                vec![abi::uint_word(*value)]
            }
            Self::Owner | Self::PauseContract | Self::ResumeContract | Self::IsPaused => vec![],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        abi::encode_call(self.method().selector(), &self.args())
    }

    /// Parse calldata back into a call. Used by the in-memory contract.
    pub fn decode(data: &[u8]) -> Result<Self, AbiError> {
        if data.len() < 4 {
            return Err(AbiError::Truncated {
                expected: 4,
                actual: data.len(),
            });
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        let method = ContractMethod::from_selector(selector).ok_or_else(|| {
            AbiError::UnexpectedValue(format!(
                "unknown selector {}",
                abi::encode_hex_prefixed(&selector)
            ))
        })?;
        let body = &data[4..];
        let address_arg = || abi::decode_address(body);
        let uint_arg = || {
            let word = abi::decode_uint(body)?;
            abi::word_to_u128(&word).ok_or_else(|| {
                AbiError::UnexpectedValue("uint256 argument exceeds 128 bits".to_string())
            })
        };

        let call = match method {
            ContractMethod::Owner => Self::Owner,
            ContractMethod::IsAccountFrozen => Self::IsAccountFrozen(address_arg()?),
            ContractMethod::FreezeAccount => Self::FreezeAccount(address_arg()?),
            ContractMethod::UnfreezeAccount => Self::UnfreezeAccount(address_arg()?),
            ContractMethod::TransferOwnership => Self::TransferOwnership(address_arg()?),
            ContractMethod::PauseContract => Self::PauseContract,
            ContractMethod::ResumeContract => Self::ResumeContract,
            ContractMethod::IsPaused => Self::IsPaused,
            ContractMethod::GetUserTransactions => Self::GetUserTransactions(address_arg()?),
            ContractMethod::UpdateFraudDetectionThreshold => {
                Self::UpdateFraudDetectionThreshold(uint_arg()?)
            }
            ContractMethod::UpdatePenaltyAmount => Self::UpdatePenaltyAmount(uint_arg()?),
        };
        let expected = 4 + call.args().len() * WORD_LEN;
        if data.len() != expected {
            return Err(AbiError::UnexpectedValue(format!(
                "{} calldata must be {} bytes, got {}",
                method,
                expected,
                data.len()
            )));
        }
        Ok(call)
    }
}
