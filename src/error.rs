//! Error types for tokenguard.
//!
//! Every failure the console can report is classified into one
//! [`ErrorKind`]. Validation and authorization failures are raised before any
//! provider call; everything else carries the provider's message verbatim.

use serde::Serialize;

/// Top-level error type for the console.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl Error {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Config(_) => None,
            Self::Session(e) => Some(e.kind()),
            Self::Action(e) => Some(e.kind()),
            Self::Provider(e) => Some(e.kind()),
        }
    }
}

/// Failure classification shared by session establishment and action
/// execution.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No wallet provider is present. Fatal to the session; fixed outside the
    /// console by installing or enabling the wallet.
    ProviderUnavailable,
    /// The wallet holder declined the prompt.
    UserRejected,
    /// Connecting or reading the owner failed. Safe to retry `connect()`.
    ConnectionFailed,
    /// Request parameters are missing or malformed. Never reaches the network.
    InvalidInput,
    /// The session role does not permit the action. Never reaches the network.
    Unauthorized,
    /// Submission or confirmation failed after reaching the network.
    Failed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "provider_unavailable",
            Self::UserRejected => "user_rejected",
            Self::ConnectionFailed => "connection_failed",
            Self::InvalidInput => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::Failed => "failed",
        }
    }

    /// Whether re-offering the same operation is safe without human review.
    ///
    /// `Failed` is excluded: a state-changing call that failed after
    /// submission is not provably safe to resubmit.
    pub fn retryable(self) -> bool {
        matches!(self, Self::UserRejected | Self::ConnectionFailed)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EIP-1193 code for "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Error reported by a wallet provider or the node behind it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Transport-level failure with no provider code attached.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn user_rejected() -> Self {
        Self::new(Some(USER_REJECTED_CODE), "User rejected the request.")
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(USER_REJECTED_CODE)
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_user_rejection() {
            ErrorKind::UserRejected
        } else {
            ErrorKind::Failed
        }
    }
}

/// Errors raised while establishing a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No wallet provider available. Install or enable a wallet extension.")]
    ProviderUnavailable,

    #[error("Connection rejected by user.")]
    UserRejected,

    #[error("Error connecting wallet: {0}")]
    ConnectionFailed(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderUnavailable => ErrorKind::ProviderUnavailable,
            Self::UserRejected => ErrorKind::UserRejected,
            Self::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
        }
    }
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        if err.is_user_rejection() {
            Self::UserRejected
        } else {
            Self::ConnectionFailed(err.message)
        }
    }
}

/// Errors resolved locally by the action gateway, before any provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {action} requires the {required} role, session is {actual}")]
    Unauthorized {
        action: String,
        required: String,
        actual: String,
    },
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
