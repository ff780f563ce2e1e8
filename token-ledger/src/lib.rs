//! Multi-token ledger core
//!
//! One ledger instance holds balances of many token types, each addressed by
//! a local numeric id, for many accounts. Clients query balances, metadata
//! and operator permissions, transfer value, and manage operators, always in
//! batches with all-or-nothing semantics.
//!
//! # Architecture
//!
//! - **Ledger Store**: (account, token) -> balance, plus the token existence set
//! - **Authorization Registry**: owner -> operators allowed to act for it
//! - **Batch Executor**: validate against a projection, then apply, never partially
//! - **Query Service**: read-only batch lookups over the same state
//! - **Single Writer**: one actor task serializes every mutating batch
//!
//! # Invariants
//!
//! - Atomicity: a rejected batch leaves every balance and operator untouched
//! - Balances never go negative, including across requests of one batch
//! - Supply conservation: Σ(balances of token) == total supply of token
//! - Absent holding of an existing token reads as zero; absent token is an error
//! - An owner is always authorized for itself

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod error;
pub mod config;
pub mod store;
pub mod registry;
pub mod policy;
pub mod state;
pub mod executor;
pub mod query;
pub mod actor;
pub mod ledger;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Account, Balance, BalanceRequest, CanisterId, IsAuthorizedRequest, Metadata,
    OperatorAction, OperatorChange, OperatorRequest, TokenId, TokenIdentifier, TransferRequest,
};
pub use config::Config;
pub use ledger::Ledger;
pub use policy::{AccountPolicy, AllowAll, StandardPolicy};
pub use state::{LedgerSnapshot, LedgerState};
