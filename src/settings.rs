//! Console settings file.
//!
//! Stored in `~/.tokenguard/config.toml`. Every field is optional; env vars
//! override file values and built-in defaults fill the rest.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// JSON-RPC endpoint of the wallet bridge or node.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Address of the deployed contract.
    #[serde(default)]
    pub contract_address: Option<String>,

    /// Decimals of the native value unit.
    #[serde(default)]
    pub value_decimals: Option<u32>,

    /// Display symbol of the native value unit.
    #[serde(default)]
    pub value_symbol: Option<String>,

    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Stop waiting for a confirmation after this many seconds.
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
}

impl Settings {
    /// `~/.tokenguard`
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tokenguard")
    }

    pub fn default_toml_path() -> PathBuf {
        Self::default_dir().join("config.toml")
    }

    /// Load from `path`. A missing file is `Ok(None)`.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Overlay every field that `other` sets.
    pub fn merge_from(&mut self, other: &Self) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            rpc_url,
            contract_address,
            value_decimals,
            value_symbol,
            poll_interval_ms,
            request_timeout_ms,
            confirmation_timeout_secs
        );
    }
}
