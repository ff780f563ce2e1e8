//! Batch executor: all-or-nothing transfers and operator updates
//!
//! # Protocol
//!
//! 1. **Validate** every request in order against a projection: the real
//!    store plus the cumulative effect of earlier requests in the same batch.
//! 2. **Apply** every request in order, only if all of them validated.
//!
//! Nothing is written during validation, so a rejected batch needs no undo
//! log and the store is never observable in an intermediate state. The first
//! failing request in submission order decides the single error returned.
//!
//! Per-request check order for transfers: token existence, authorization,
//! destination validity, projected balance.

use crate::{
    error::{Error, Result},
    policy::AccountPolicy,
    registry::AuthorizationRegistry,
    state::LedgerState,
    store::LedgerStore,
    types::{Account, Balance, OperatorAction, OperatorRequest, TokenId, TransferRequest},
};
use std::collections::HashMap;

/// Balances as they would stand after the already-validated prefix of a batch
#[derive(Debug)]
struct Projection<'r> {
    balances: HashMap<(&'r Account, TokenId), Balance>,
}

impl<'r> Projection<'r> {
    fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    fn balance(&self, store: &LedgerStore, account: &'r Account, token_id: TokenId) -> Result<Balance> {
        match self.balances.get(&(account, token_id)) {
            Some(balance) => Ok(balance.clone()),
            None => store.balance_of(account, token_id),
        }
    }

    /// Reserve `amount` moving from `from` to `to`
    fn reserve(
        &mut self,
        store: &LedgerStore,
        from: &'r Account,
        to: &'r Account,
        token_id: TokenId,
        amount: &Balance,
    ) -> Result<()> {
        let from_balance = self.balance(store, from, token_id)?;
        let remaining = from_balance
            .checked_sub(amount)
            .ok_or(Error::InsufficientBalance)?;

        if from == to {
            return Ok(());
        }

        let credited = self.balance(store, to, token_id)? + amount;

        self.balances.insert((from, token_id), remaining);
        self.balances.insert((to, token_id), credited);
        Ok(())
    }
}

/// Runs mutating batches against ledger state
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor<'p> {
    policy: &'p dyn AccountPolicy,
}

impl<'p> BatchExecutor<'p> {
    /// Create executor using `policy` for destination and owner checks
    pub fn new(policy: &'p dyn AccountPolicy) -> Self {
        Self { policy }
    }

    /// Execute a transfer batch on behalf of `caller`
    ///
    /// Returns the number of transfers applied. On error no transfer has been
    /// applied.
    pub fn transfer(
        &self,
        state: &mut LedgerState,
        caller: &Account,
        requests: &[TransferRequest],
    ) -> Result<usize> {
        self.validate_transfers(&state.store, &state.registry, caller, requests)
            .map_err(|(index, err)| {
                tracing::warn!(index, error = %err, "Transfer batch rejected");
                err
            })?;

        for req in requests {
            state
                .store
                .apply_transfer(&req.from, &req.to, req.token_id, &req.amount);
        }

        tracing::debug!("Applied {} transfers", requests.len());
        Ok(requests.len())
    }

    /// Execute an operator update batch on behalf of `caller`
    ///
    /// Returns the number of (operator, action) pairs applied.
    pub fn update_operator(
        &self,
        state: &mut LedgerState,
        caller: &Account,
        requests: &[OperatorRequest],
    ) -> Result<usize> {
        self.validate_operator_updates(caller, requests)
            .map_err(|(index, err)| {
                tracing::warn!(index, error = %err, "Operator batch rejected");
                err
            })?;

        let mut applied = 0;
        for req in requests {
            for change in &req.operators {
                match change.action {
                    OperatorAction::AddOperator => {
                        state.registry.add_operator(&req.owner, &change.operator)
                    }
                    OperatorAction::RemoveOperator => {
                        state.registry.remove_operator(&req.owner, &change.operator)
                    }
                }
                applied += 1;
            }
        }

        tracing::debug!("Applied {} operator changes", applied);
        Ok(applied)
    }

    /// Validate a transfer batch without mutating anything
    ///
    /// On failure returns the index of the first failing request and its error.
    pub fn validate_transfers(
        &self,
        store: &LedgerStore,
        registry: &AuthorizationRegistry,
        caller: &Account,
        requests: &[TransferRequest],
    ) -> std::result::Result<(), (usize, Error)> {
        let mut projection = Projection::new();

        for (index, req) in requests.iter().enumerate() {
            self.validate_transfer(store, registry, caller, req, &mut projection)
                .map_err(|err| (index, err))?;
        }

        Ok(())
    }

    fn validate_transfer<'r>(
        &self,
        store: &LedgerStore,
        registry: &AuthorizationRegistry,
        caller: &Account,
        req: &'r TransferRequest,
        projection: &mut Projection<'r>,
    ) -> Result<()> {
        if !store.token_exists(req.token_id) {
            return Err(Error::InvalidToken(req.token_id));
        }

        if !registry.is_authorized(&req.from, caller) {
            return Err(Error::Unauthorized);
        }

        if !self.policy.is_valid_destination(&req.to) {
            return Err(Error::InvalidDestination(req.to.clone()));
        }

        projection.reserve(store, &req.from, &req.to, req.token_id, &req.amount)
    }

    /// Validate an operator batch without mutating anything
    pub fn validate_operator_updates(
        &self,
        caller: &Account,
        requests: &[OperatorRequest],
    ) -> std::result::Result<(), (usize, Error)> {
        for (index, req) in requests.iter().enumerate() {
            if &req.owner != caller {
                return Err((index, Error::Unauthorized));
            }

            if !self.policy.is_valid_owner(&req.owner) {
                return Err((index, Error::InvalidOwner(req.owner.clone())));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AllowAll, StandardPolicy};
    use crate::config::PolicyConfig;
    use crate::types::{Metadata, OperatorChange};

    fn alice() -> Account {
        Account::new("alice")
    }

    fn bob() -> Account {
        Account::new("bob")
    }

    fn state() -> LedgerState {
        let mut state = LedgerState::new();
        state.store.register_token(TokenId::new(1), Metadata::new("gold")).unwrap();
        state.store.register_token(TokenId::new(2), Metadata::new("silver")).unwrap();
        state.store.mint(&alice(), TokenId::new(1), &Balance::new(100)).unwrap();
        state
    }

    fn balance(state: &LedgerState, who: &str, token: u32) -> u128 {
        state
            .store
            .balance_of(&Account::new(who), TokenId::new(token))
            .unwrap()
            .to_u128()
            .unwrap()
    }

    fn blocking(blocked: &str) -> StandardPolicy {
        StandardPolicy::from_config(&PolicyConfig {
            blocked_accounts: vec![Account::new(blocked)],
            ..PolicyConfig::default()
        })
    }

    #[test]
    fn test_transfer_applies_in_order() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);

        let applied = executor
            .transfer(
                &mut state,
                &alice(),
                &[
                    TransferRequest::new("alice", "bob", 1, 60),
                    TransferRequest::new("alice", "carol", 1, 40),
                ],
            )
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(balance(&state, "alice", 1), 0);
        assert_eq!(balance(&state, "bob", 1), 60);
        assert_eq!(balance(&state, "carol", 1), 40);
    }

    #[test]
    fn test_intra_batch_double_spend_rejected() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);

        let result = executor.transfer(
            &mut state,
            &alice(),
            &[
                TransferRequest::new("alice", "bob", 1, 60),
                TransferRequest::new("alice", "carol", 1, 60),
            ],
        );

        assert_eq!(result, Err(Error::InsufficientBalance));
        assert_eq!(balance(&state, "alice", 1), 100);
        assert_eq!(balance(&state, "bob", 1), 0);
        assert_eq!(balance(&state, "carol", 1), 0);
    }

    #[test]
    fn test_received_funds_spendable_later_in_batch() {
        let mut state = state();
        state.registry.add_operator(&bob(), &alice());
        let executor = BatchExecutor::new(&AllowAll);

        executor
            .transfer(
                &mut state,
                &alice(),
                &[
                    TransferRequest::new("alice", "bob", 1, 70),
                    TransferRequest::new("bob", "carol", 1, 70),
                ],
            )
            .unwrap();

        assert_eq!(balance(&state, "bob", 1), 0);
        assert_eq!(balance(&state, "carol", 1), 70);
    }

    #[test]
    fn test_unknown_token_rejects_whole_batch() {
        let mut state = LedgerState::new();
        state.store.register_token(TokenId::new(1), Metadata::default()).unwrap();
        state.store.register_token(TokenId::new(2), Metadata::default()).unwrap();
        state.store.mint(&alice(), TokenId::new(1), &Balance::new(50)).unwrap();
        let executor = BatchExecutor::new(&AllowAll);

        let result = executor.transfer(
            &mut state,
            &alice(),
            &[
                TransferRequest::new("alice", "bob", 1, 30),
                TransferRequest::new("alice", "bob", 3, 10),
            ],
        );

        assert_eq!(result, Err(Error::InvalidToken(TokenId::new(3))));
        assert_eq!(balance(&state, "alice", 1), 50);
        assert_eq!(balance(&state, "bob", 1), 0);
    }

    #[test]
    fn test_unauthorized_caller() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);

        let result = executor.transfer(
            &mut state,
            &bob(),
            &[TransferRequest::new("alice", "bob", 1, 10)],
        );
        assert_eq!(result, Err(Error::Unauthorized));

        state.registry.add_operator(&alice(), &bob());
        executor
            .transfer(&mut state, &bob(), &[TransferRequest::new("alice", "bob", 1, 10)])
            .unwrap();
        assert_eq!(balance(&state, "bob", 1), 10);
    }

    #[test]
    fn test_invalid_destination() {
        let mut state = state();
        let policy = StandardPolicy::from_config(&PolicyConfig::default());
        let executor = BatchExecutor::new(&policy);

        let result = executor.transfer(
            &mut state,
            &alice(),
            &[
                TransferRequest::new("alice", "bob", 1, 10),
                TransferRequest::new(alice(), Account::anonymous(), 1, 10),
            ],
        );

        assert_eq!(result, Err(Error::InvalidDestination(Account::anonymous())));
        assert_eq!(balance(&state, "alice", 1), 100);
    }

    #[test]
    fn test_first_failure_wins() {
        let state = state();
        let executor = BatchExecutor::new(&AllowAll);

        let result = executor.validate_transfers(
            &state.store,
            &state.registry,
            &alice(),
            &[
                TransferRequest::new("alice", "bob", 1, 10),
                TransferRequest::new("alice", "bob", 1, 500),
                TransferRequest::new("alice", "bob", 9, 1),
            ],
        );
        assert_eq!(result, Err((1, Error::InsufficientBalance)));
    }

    #[test]
    fn test_token_checked_before_authorization() {
        let state = state();
        let executor = BatchExecutor::new(&AllowAll);

        let result = executor.validate_transfers(
            &state.store,
            &state.registry,
            &bob(),
            &[TransferRequest::new("alice", "bob", 9, 1)],
        );
        assert_eq!(result, Err((0, Error::InvalidToken(TokenId::new(9)))));
    }

    #[test]
    fn test_authorization_checked_before_destination() {
        let state = state();
        let policy = blocking("mallory");
        let executor = BatchExecutor::new(&policy);

        let result = executor.validate_transfers(
            &state.store,
            &state.registry,
            &bob(),
            &[TransferRequest::new("alice", "mallory", 1, 10)],
        );
        assert_eq!(result, Err((0, Error::Unauthorized)));
    }

    #[test]
    fn test_destination_checked_before_balance() {
        let mut state = state();
        let policy = blocking("mallory");
        let executor = BatchExecutor::new(&policy);

        let result = executor.transfer(
            &mut state,
            &alice(),
            &[TransferRequest::new("alice", "mallory", 1, 1_000)],
        );
        assert_eq!(result, Err(Error::InvalidDestination(Account::new("mallory"))));
        assert_eq!(balance(&state, "alice", 1), 100);
    }

    #[test]
    fn test_owner_mismatch_checked_before_owner_validity() {
        let mut state = state();
        let policy = blocking("mallory");
        let executor = BatchExecutor::new(&policy);

        let result = executor.validate_operator_updates(
            &alice(),
            &[OperatorRequest::new("mallory", vec![OperatorChange::add("bob")])],
        );
        assert_eq!(result, Err((0, Error::Unauthorized)));

        let result = executor.update_operator(
            &mut state,
            &Account::new("mallory"),
            &[OperatorRequest::new("mallory", vec![OperatorChange::add("bob")])],
        );
        assert_eq!(result, Err(Error::InvalidOwner(Account::new("mallory"))));
        assert_eq!(state.registry.operator_count(), 0);
    }

    #[test]
    fn test_transfer_beyond_u128() {
        let mut state = LedgerState::new();
        let huge: Balance = "1000000000000000000000000000000000000000000".parse().unwrap();
        state.store.register_token(TokenId::new(1), Metadata::default()).unwrap();
        state.store.mint(&alice(), TokenId::new(1), &huge).unwrap();
        state.store.mint(&bob(), TokenId::new(1), &huge).unwrap();
        let executor = BatchExecutor::new(&AllowAll);

        let requests = [TransferRequest {
            from: alice(),
            to: bob(),
            token_id: TokenId::new(1),
            amount: huge.clone(),
        }];
        executor.transfer(&mut state, &alice(), &requests).unwrap();

        assert_eq!(
            state.store.balance_of(&bob(), TokenId::new(1)).unwrap(),
            huge.clone() + &huge
        );
        assert!(state.store.balance_of(&alice(), TokenId::new(1)).unwrap().is_zero());
        assert_eq!(executor.transfer(&mut state, &alice(), &requests), Err(Error::InsufficientBalance));
    }

    #[test]
    fn test_zero_and_self_transfers() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);

        executor
            .transfer(
                &mut state,
                &alice(),
                &[
                    TransferRequest::new("alice", "bob", 2, 0),
                    TransferRequest::new("alice", "alice", 1, 100),
                    TransferRequest::new("alice", "bob", 1, 100),
                ],
            )
            .unwrap();
        assert_eq!(balance(&state, "bob", 1), 100);
        assert_eq!(balance(&state, "bob", 2), 0);

        let result = executor.transfer(
            &mut state,
            &bob(),
            &[TransferRequest::new("bob", "bob", 1, 101)],
        );
        assert_eq!(result, Err(Error::InsufficientBalance));
    }

    #[test]
    fn test_empty_batch_succeeds() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);
        assert_eq!(executor.transfer(&mut state, &alice(), &[]), Ok(0));
        assert_eq!(executor.update_operator(&mut state, &alice(), &[]), Ok(0));
    }

    #[test]
    fn test_update_operator_last_write_wins() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);

        let applied = executor
            .update_operator(
                &mut state,
                &alice(),
                &[
                    OperatorRequest::new(
                        "alice",
                        vec![OperatorChange::add("bob"), OperatorChange::add("carol")],
                    ),
                    OperatorRequest::new("alice", vec![OperatorChange::remove("bob")]),
                ],
            )
            .unwrap();

        assert_eq!(applied, 3);
        assert!(!state.registry.is_authorized(&alice(), &bob()));
        assert!(state.registry.is_authorized(&alice(), &Account::new("carol")));
    }

    #[test]
    fn test_update_operator_only_owner() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);

        let result = executor.update_operator(
            &mut state,
            &alice(),
            &[
                OperatorRequest::new("alice", vec![OperatorChange::add("carol")]),
                OperatorRequest::new("bob", vec![OperatorChange::add("alice")]),
            ],
        );

        assert_eq!(result, Err(Error::Unauthorized));
        assert_eq!(state.registry.operator_count(), 0);
    }

    #[test]
    fn test_update_operator_invalid_owner() {
        let mut state = state();
        let policy = StandardPolicy::from_config(&PolicyConfig::default());
        let executor = BatchExecutor::new(&policy);
        let anon = Account::anonymous();

        let result = executor.update_operator(
            &mut state,
            &anon,
            &[OperatorRequest::new(anon.clone(), vec![OperatorChange::add("bob")])],
        );
        assert_eq!(result, Err(Error::InvalidOwner(anon)));
        assert_eq!(state.registry.operator_count(), 0);
    }

    #[test]
    fn test_remove_never_added_is_noop() {
        let mut state = state();
        let executor = BatchExecutor::new(&AllowAll);
        let result = executor.update_operator(
            &mut state,
            &alice(),
            &[OperatorRequest::new("alice", vec![OperatorChange::remove("bob")])],
        );
        assert_eq!(result, Ok(1));
        assert_eq!(state.registry.operator_count(), 0);
    }
}
