//! Configuration for the tokenguard console.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! `./.env` and `~/.tokenguard/.env` are loaded through dotenvy before
//! anything is resolved.

mod contract;
pub(crate) mod helpers;
mod rpc;

use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::settings::Settings;

pub use self::contract::{ContractConfig, DEFAULT_CONTRACT_ADDRESS};
pub use self::rpc::{DEFAULT_RPC_URL, RpcConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub rpc: RpcConfig,
    pub contract: ContractConfig,
    /// How long the console waits for a confirmation before reporting the
    /// transaction as pending. `None` waits indefinitely.
    pub confirmation_timeout: Option<Duration>,
}

impl Config {
    /// Load from env with an optional TOML config file overlay.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        crate::bootstrap::load_env();
        let mut settings = Settings::default();
        Self::apply_toml_overlay(&mut settings, toml_path)?;
        Self::build(&settings)
    }

    /// Load and merge a TOML config file into settings.
    ///
    /// An explicit path must exist and parse. The default path
    /// `~/.tokenguard/config.toml` is optional.
    fn apply_toml_overlay(
        settings: &mut Settings,
        explicit_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = explicit_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(toml_settings)) => {
                settings.merge_from(&toml_settings);
                tracing::debug!("Loaded TOML config from {}", path.display());
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Failed to load config file {}: {}",
                        path.display(),
                        e
                    )));
                }
                tracing::warn!("Failed to load default config file: {}", e);
            }
        }
        Ok(())
    }

    pub(crate) fn build(settings: &Settings) -> Result<Self, ConfigError> {
        let confirmation_timeout = helpers::parse_env_or(
            "TOKENGUARD_CONFIRMATION_TIMEOUT_SECS",
            settings.confirmation_timeout_secs,
        )?
        .map(|secs| helpers::require_positive("TOKENGUARD_CONFIRMATION_TIMEOUT_SECS", secs))
        .transpose()?
        .map(Duration::from_secs);

        Ok(Self {
            rpc: RpcConfig::resolve(settings)?,
            contract: ContractConfig::resolve(settings)?,
            confirmation_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Address;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const KEYS: &[&str] = &[
        "TOKENGUARD_RPC_URL",
        "TOKENGUARD_CONTRACT_ADDRESS",
        "TOKENGUARD_VALUE_DECIMALS",
        "TOKENGUARD_VALUE_SYMBOL",
        "TOKENGUARD_POLL_INTERVAL_MS",
        "TOKENGUARD_REQUEST_TIMEOUT_MS",
        "TOKENGUARD_CONFIRMATION_TIMEOUT_SECS",
    ];

    fn clear_env() {
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            for key in KEYS {
                std::env::remove_var(key);
            }
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: Guarded by ENV_MUTEX in tests.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    #[test]
    fn defaults_resolve_without_env_or_file() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();

        let config = Config::build(&Settings::default()).expect("resolve");
        assert_eq!(config.rpc.url.as_str(), "http://127.0.0.1:8545/");
        assert_eq!(config.rpc.poll_interval, Duration::from_millis(1_000));
        assert_eq!(config.rpc.request_timeout, Duration::from_millis(30_000));
        assert_eq!(
            config.contract.address,
            Address::parse(DEFAULT_CONTRACT_ADDRESS).unwrap()
        );
        assert_eq!(config.contract.value_decimals, 18);
        assert_eq!(config.contract.value_symbol, "ETH");
        assert_eq!(config.confirmation_timeout, None);
    }

    #[test]
    fn env_overrides_settings() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        clear_env();
        set_env("TOKENGUARD_RPC_URL", "http://node:9545");
        set_env("TOKENGUARD_CONFIRMATION_TIMEOUT_SECS", "90");

        let settings = Settings {
            rpc_url: Some("http://file:8545".to_string()),
            value_decimals: Some(6),
            ..Settings::default()
        };
        let config = Config::build(&settings).expect("resolve");
        assert_eq!(config.rpc.url.as_str(), "http://node:9545/");
        assert_eq!(config.contract.value_decimals, 6);
        assert_eq!(config.confirmation_timeout, Some(Duration::from_secs(90)));

        clear_env();
    }

    #[test]
    fn invalid_values_name_their_key() {
        let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");

        for (key, value) in [
            ("TOKENGUARD_RPC_URL", "not a url"),
            ("TOKENGUARD_RPC_URL", "ws://127.0.0.1:8546"),
            ("TOKENGUARD_CONTRACT_ADDRESS", "0x1234"),
            ("TOKENGUARD_CONTRACT_ADDRESS", "0x0000000000000000000000000000000000000000"),
            ("TOKENGUARD_VALUE_DECIMALS", "39"),
            ("TOKENGUARD_VALUE_DECIMALS", "-1"),
            ("TOKENGUARD_POLL_INTERVAL_MS", "0"),
            ("TOKENGUARD_REQUEST_TIMEOUT_MS", "soon"),
            ("TOKENGUARD_CONFIRMATION_TIMEOUT_SECS", "0"),
        ] {
            clear_env();
            set_env(key, value);
            match Config::build(&Settings::default()) {
                Err(ConfigError::InvalidValue { key: got, .. }) => assert_eq!(got, key),
                other => panic!("{key}={value}: expected InvalidValue, got {other:?}"),
            }
        }
        clear_env();
    }

    #[test]
    fn missing_explicit_config_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        let err = Config::apply_toml_overlay(&mut settings, Some(&dir.path().join("nope.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn explicit_config_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "value_symbol = \"MATIC\"\npoll_interval_ms = 250\n").unwrap();

        let mut settings = Settings::default();
        Config::apply_toml_overlay(&mut settings, Some(&path)).unwrap();
        assert_eq!(settings.value_symbol.as_deref(), Some("MATIC"));
        assert_eq!(settings.poll_interval_ms, Some(250));
    }
}
