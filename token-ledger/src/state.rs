//! The single owning state object: ledger store plus authorization registry
//!
//! Both maps live together so one lock (or one `&mut`) covers a whole batch:
//! transfer authorization reads the registry while mutating the store, and
//! both must be consistent at every observation point.

use crate::{
    config::GenesisConfig,
    registry::AuthorizationRegistry,
    store::LedgerStore,
    types::{Account, Balance, Metadata, TokenId},
    Result,
};
use serde::{Deserialize, Serialize};

/// Ledger state owned by one service instance
///
/// Outside this crate the state is read-only: it is seeded from genesis and
/// changed afterwards only by `BatchExecutor`.
///
/// ```compile_fail
/// let mut state = token_ledger::LedgerState::new();
/// let _registry = &mut state.registry;
/// ```
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    /// Balances and token existence
    pub(crate) store: LedgerStore,

    /// Operator relation
    pub(crate) registry: AuthorizationRegistry,
}

impl LedgerState {
    /// Create empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Balances and token existence
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Operator relation
    pub fn registry(&self) -> &AuthorizationRegistry {
        &self.registry
    }

    /// Create state pre-seeded from genesis configuration
    pub fn from_genesis(genesis: &GenesisConfig) -> Result<Self> {
        let mut state = Self::new();

        for token in &genesis.tokens {
            state.store.register_token(token.id, token.metadata.clone())?;
            for holding in &token.balances {
                state.store.mint(&holding.account, token.id, &holding.amount)?;
            }
        }

        tracing::info!(
            "Seeded ledger with {} tokens from genesis",
            state.store.token_count()
        );

        Ok(state)
    }

    /// Point-in-time copy of all balances and operators
    pub fn snapshot(&self) -> LedgerSnapshot {
        let tokens = self
            .store
            .token_ids()
            .into_iter()
            .filter_map(|token_id| {
                // Ids come from the store itself, so these lookups succeed
                let metadata = self.store.metadata(token_id).ok()?.clone();
                let total_supply = self.store.total_supply(token_id).ok()?;
                let holders = self.store.holders(token_id).ok()?;
                Some(TokenSnapshot {
                    token_id,
                    metadata,
                    total_supply,
                    holders,
                })
            })
            .collect();

        let operators = self
            .registry
            .owners()
            .into_iter()
            .map(|owner| {
                let ops = self.registry.operators_of(&owner);
                (owner, ops)
            })
            .collect();

        LedgerSnapshot { tokens, operators }
    }
}

/// Serializable view of the whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Tokens, ascending by id
    pub tokens: Vec<TokenSnapshot>,

    /// (owner, operators), ascending by owner
    pub operators: Vec<(Account, Vec<Account>)>,
}

/// Serializable view of one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Token id
    pub token_id: TokenId,

    /// Metadata blob
    pub metadata: Metadata,

    /// Total supply
    pub total_supply: Balance,

    /// Non-zero holders, ascending by account
    pub holders: Vec<(Account, Balance)>,
}

impl LedgerSnapshot {
    /// Render as pretty JSON
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to render snapshot: {}", e)))
    }
}
