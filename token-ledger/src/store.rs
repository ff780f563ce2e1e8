//! Ledger store: balances per (account, token) and the token existence set
//!
//! # Invariants
//!
//! - Absent holding of an existing token reads as zero; absent token is an error
//! - Balances never go negative
//! - Supply conservation: Σ(balances of token) == total_supply(token)
//!
//! Zero balances are not stored, so a holder that transfers everything away
//! disappears from `holders()`.

use crate::{
    error::{Error, Result},
    types::{Account, Balance, Metadata, TokenId},
};
use std::collections::{BTreeMap, HashMap};

/// State of a single token type
#[derive(Debug, Clone, Default)]
struct TokenLedger {
    metadata: Metadata,
    total_supply: Balance,
    balances: HashMap<Account, Balance>,
}

/// Authoritative balance store
#[derive(Debug, Clone, Default)]
pub struct LedgerStore {
    tokens: BTreeMap<TokenId, TokenLedger>,
}

impl LedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the token id is in the existence set
    pub fn token_exists(&self, token_id: TokenId) -> bool {
        self.tokens.contains_key(&token_id)
    }

    /// Balance of `account` for `token_id`, zero if the account holds none
    pub fn balance_of(&self, account: &Account, token_id: TokenId) -> Result<Balance> {
        let token = self.token(token_id)?;
        Ok(token.balances.get(account).cloned().unwrap_or_default())
    }

    /// Metadata blob for `token_id`
    pub fn metadata(&self, token_id: TokenId) -> Result<&Metadata> {
        Ok(&self.token(token_id)?.metadata)
    }

    /// Sum of all balances of `token_id`
    pub fn total_supply(&self, token_id: TokenId) -> Result<Balance> {
        Ok(self.token(token_id)?.total_supply.clone())
    }

    /// Existing token ids, ascending
    pub fn token_ids(&self) -> Vec<TokenId> {
        self.tokens.keys().copied().collect()
    }

    /// Number of registered tokens
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Non-zero holders of `token_id`, sorted by account
    pub fn holders(&self, token_id: TokenId) -> Result<Vec<(Account, Balance)>> {
        let token = self.token(token_id)?;
        let mut holders: Vec<_> = token
            .balances
            .iter()
            .map(|(account, balance)| (account.clone(), balance.clone()))
            .collect();
        holders.sort();
        Ok(holders)
    }

    /// Add `token_id` to the existence set
    pub(crate) fn register_token(&mut self, token_id: TokenId, metadata: Metadata) -> Result<()> {
        if self.token_exists(token_id) {
            return Err(Error::TokenAlreadyExists(token_id));
        }

        self.tokens.insert(
            token_id,
            TokenLedger {
                metadata,
                ..TokenLedger::default()
            },
        );
        Ok(())
    }

    /// Credit `amount` of a registered token to `to`, growing its supply
    ///
    /// Genesis seeding only; the batch surface never mints.
    pub(crate) fn mint(&mut self, to: &Account, token_id: TokenId, amount: &Balance) -> Result<()> {
        let token = self
            .tokens
            .get_mut(&token_id)
            .ok_or(Error::InvalidToken(token_id))?;

        token.total_supply += amount;
        if !amount.is_zero() {
            *token.balances.entry(to.clone()).or_default() += amount;
        }
        Ok(())
    }

    /// Move `amount` of `token_id` from `from` to `to`
    ///
    /// Precondition, checked by the batch executor: the token exists and
    /// `from` holds at least `amount`. Under that precondition this never
    /// fails; a violation is a logic error in the caller and is logged and
    /// skipped without touching either balance.
    pub(crate) fn apply_transfer(
        &mut self,
        from: &Account,
        to: &Account,
        token_id: TokenId,
        amount: &Balance,
    ) {
        if amount.is_zero() || from == to {
            return;
        }

        let Some(token) = self.tokens.get_mut(&token_id) else {
            tracing::error!(%token_id, %from, %to, %amount, "Transfer of unknown token skipped");
            debug_assert!(false, "transfer of unknown token {token_id}");
            return;
        };

        let from_balance = token.balances.get(from).cloned().unwrap_or_default();
        let Some(remaining) = from_balance.checked_sub(amount) else {
            tracing::error!(
                %token_id,
                %from,
                %to,
                %amount,
                balance = %from_balance,
                "Transfer exceeding balance skipped"
            );
            debug_assert!(false, "transfer exceeds balance of {from}");
            return;
        };

        if remaining.is_zero() {
            token.balances.remove(from);
        } else {
            token.balances.insert(from.clone(), remaining);
        }

        *token.balances.entry(to.clone()).or_default() += amount;
    }

    fn token(&self, token_id: TokenId) -> Result<&TokenLedger> {
        self.tokens
            .get(&token_id)
            .ok_or(Error::InvalidToken(token_id))
    }
}
