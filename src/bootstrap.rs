//! Environment bootstrap.
//!
//! Loads `./.env` and then `~/.tokenguard/.env`. dotenvy never overwrites
//! variables that are already set, so the effective priority is:
//!
//!   explicit env vars > `./.env` > `~/.tokenguard/.env`

use std::path::PathBuf;

use crate::settings::Settings;

/// Path to the console's own `.env` file: `~/.tokenguard/.env`.
pub fn tokenguard_env_path() -> PathBuf {
    Settings::default_dir().join(".env")
}

pub fn load_env() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded env from {}", path.display());
    }

    let path = tokenguard_env_path();
    if path.exists() {
        if let Err(e) = dotenvy::from_path(&path) {
            tracing::warn!("Failed to load {}: {}", path.display(), e);
        }
    }
}
