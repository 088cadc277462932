use crate::config::helpers::{optional_env, parse_env_or};
use crate::contract::Address;
use crate::error::ConfigError;
use crate::settings::Settings;
use crate::units::NATIVE_DECIMALS;

/// Deployed contract address.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x052d5d86568bef96eafa3b0a049bc4dc11d10b93";
const DEFAULT_VALUE_SYMBOL: &str = "ETH";

/// 10^38 is the largest power of ten below `u128::MAX`.
const MAX_VALUE_DECIMALS: u32 = 38;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    pub address: Address,
    /// Decimals used to convert `amount` params into base units.
    pub value_decimals: u32,
    pub value_symbol: String,
}

impl ContractConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let raw = optional_env("TOKENGUARD_CONTRACT_ADDRESS")?
            .or_else(|| settings.contract_address.clone())
            .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string());
        let address = Address::parse(&raw).map_err(|e| ConfigError::InvalidValue {
            key: "TOKENGUARD_CONTRACT_ADDRESS".to_string(),
            message: e.to_string(),
        })?;
        if address.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TOKENGUARD_CONTRACT_ADDRESS".to_string(),
                message: "must not be the zero address".to_string(),
            });
        }

        let value_decimals = parse_env_or("TOKENGUARD_VALUE_DECIMALS", settings.value_decimals)?
            .unwrap_or(NATIVE_DECIMALS);
        if value_decimals > MAX_VALUE_DECIMALS {
            return Err(ConfigError::InvalidValue {
                key: "TOKENGUARD_VALUE_DECIMALS".to_string(),
                message: format!("must be <= {MAX_VALUE_DECIMALS}, got {value_decimals}"),
            });
        }

        Ok(Self {
            address,
            value_decimals,
            value_symbol: optional_env("TOKENGUARD_VALUE_SYMBOL")?
                .or_else(|| settings.value_symbol.clone())
                .unwrap_or_else(|| DEFAULT_VALUE_SYMBOL.to_string()),
        })
    }
}
