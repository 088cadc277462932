use std::time::Duration;

use crate::config::helpers::{optional_env, parse_env_or, require_positive};
use crate::error::{ConfigError, ProviderError};
use crate::settings::Settings;
use crate::wallet::JsonRpcProvider;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Wallet bridge endpoint and transport timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub url: url::Url,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl RpcConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let raw = optional_env("TOKENGUARD_RPC_URL")?
            .or_else(|| settings.rpc_url.clone())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let url = url::Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
            key: "TOKENGUARD_RPC_URL".to_string(),
            message: format!("must be a valid URL: {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "TOKENGUARD_RPC_URL".to_string(),
                message: format!("expected an http(s) URL, got scheme '{}'", url.scheme()),
            });
        }

        let poll_ms = require_positive(
            "TOKENGUARD_POLL_INTERVAL_MS",
            parse_env_or("TOKENGUARD_POLL_INTERVAL_MS", settings.poll_interval_ms)?
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )?;
        let timeout_ms = require_positive(
            "TOKENGUARD_REQUEST_TIMEOUT_MS",
            parse_env_or("TOKENGUARD_REQUEST_TIMEOUT_MS", settings.request_timeout_ms)?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )?;

        Ok(Self {
            url,
            poll_interval: Duration::from_millis(poll_ms),
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn provider(&self) -> Result<JsonRpcProvider, ProviderError> {
        JsonRpcProvider::new(self.url.as_str(), self.request_timeout, self.poll_interval)
    }
}
