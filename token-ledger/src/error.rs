//! Error types for the ledger

use crate::types::{Account, TokenId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// The first five variants are batch rejections: deterministic given the
/// pre-batch state, reported verbatim to the caller, and always leave the
/// ledger untouched. The rest are infrastructure failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Referenced token id does not exist
    #[error("Invalid token: {0}")]
    InvalidToken(TokenId),

    /// Caller lacks permission for the account in question
    #[error("Unauthorized")]
    Unauthorized,

    /// Transfer target fails the destination policy
    #[error("Invalid destination: {0}")]
    InvalidDestination(Account),

    /// Projected balance would go negative
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Owner fails the owner policy in an operator update
    #[error("Invalid owner: {0}")]
    InvalidOwner(Account),

    /// Token id registered twice
    #[error("Token already exists: {0}")]
    TokenAlreadyExists(TokenId),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Whether this is a batch rejection rather than an infrastructure failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidToken(_)
                | Error::Unauthorized
                | Error::InvalidDestination(_)
                | Error::InsufficientBalance
                | Error::InvalidOwner(_)
        )
    }

    /// Stable label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidToken(_) => "invalid_token",
            Error::Unauthorized => "unauthorized",
            Error::InvalidDestination(_) => "invalid_destination",
            Error::InsufficientBalance => "insufficient_balance",
            Error::InvalidOwner(_) => "invalid_owner",
            Error::TokenAlreadyExists(_) => "token_already_exists",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Metrics(_) => "metrics",
            Error::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", err))
    }
}
