//! Read-only batch queries
//!
//! A query batch fails as a whole on the first unknown token, otherwise it
//! answers one element per request in request order. Nothing is mutated, so
//! a failed batch simply discards its partial result.

use crate::{
    error::Result,
    state::LedgerState,
    types::{Balance, BalanceRequest, IsAuthorizedRequest, Metadata, TokenId},
};

/// Query handlers over a borrowed state
#[derive(Debug, Clone, Copy)]
pub struct QueryService<'s> {
    state: &'s LedgerState,
}

impl<'s> QueryService<'s> {
    /// Create query service over `state`
    pub fn new(state: &'s LedgerState) -> Self {
        Self { state }
    }

    /// Balances for every request, in request order
    pub fn get_balance(&self, requests: &[BalanceRequest]) -> Result<Vec<Balance>> {
        requests
            .iter()
            .map(|req| self.state.store.balance_of(&req.user, req.token_id))
            .collect()
    }

    /// Metadata for every token id, in request order
    pub fn get_metadata(&self, token_ids: &[TokenId]) -> Result<Vec<Metadata>> {
        token_ids
            .iter()
            .map(|token_id| self.state.store.metadata(*token_id).cloned())
            .collect()
    }

    /// Authorization for every (owner, operator) pair, in request order
    pub fn is_authorized(&self, requests: &[IsAuthorizedRequest]) -> Vec<bool> {
        requests
            .iter()
            .map(|req| self.state.registry.is_authorized(&req.owner, &req.operator))
            .collect()
    }
}
