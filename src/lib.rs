//! Wallet sessions and role-gated privileged actions for an
//! owner-administered token contract.
//!
//! A [`session::SessionEstablisher`] connects a wallet and classifies the
//! account as owner or user. The [`gateway::ActionGateway`] validates and
//! authorizes each [`gateway::ActionRequest`], then queries or submits it
//! through the wallet and reports an [`gateway::ActionOutcome`].

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod session;
pub mod settings;
pub mod units;
pub mod wallet;

pub use error::{Error, ErrorKind};
pub use gateway::{ActionGateway, ActionKind, ActionOutcome, ActionRequest, OutcomeStatus};
pub use session::{Role, Session, SessionEstablisher};
