//! Authorization registry: owner -> operators permitted to act for it

use crate::types::Account;
use std::collections::{HashMap, HashSet};

/// Operator relation
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRegistry {
    operators: HashMap<Account, HashSet<Account>>,
}

impl AuthorizationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `operator` may act for `owner`. An owner is always authorized for itself.
    pub fn is_authorized(&self, owner: &Account, operator: &Account) -> bool {
        owner == operator
            || self
                .operators
                .get(owner)
                .is_some_and(|ops| ops.contains(operator))
    }

    /// Grant `operator` on `owner`. Idempotent.
    pub(crate) fn add_operator(&mut self, owner: &Account, operator: &Account) {
        self.operators
            .entry(owner.clone())
            .or_default()
            .insert(operator.clone());
    }

    /// Revoke `operator` on `owner`. Removing an absent operator is a no-op.
    pub(crate) fn remove_operator(&mut self, owner: &Account, operator: &Account) {
        if let Some(ops) = self.operators.get_mut(owner) {
            ops.remove(operator);
            if ops.is_empty() {
                self.operators.remove(owner);
            }
        }
    }

    /// Operators of `owner`, sorted
    pub fn operators_of(&self, owner: &Account) -> Vec<Account> {
        let mut ops: Vec<_> = self
            .operators
            .get(owner)
            .map(|ops| ops.iter().cloned().collect())
            .unwrap_or_default();
        ops.sort();
        ops
    }

    /// Total number of (owner, operator) pairs
    pub fn operator_count(&self) -> usize {
        self.operators.values().map(HashSet::len).sum()
    }

    /// Owners with at least one operator, sorted
    pub fn owners(&self) -> Vec<Account> {
        let mut owners: Vec<_> = self.operators.keys().cloned().collect();
        owners.sort();
        owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_always_authorized() {
        let registry = AuthorizationRegistry::new();
        let alice = Account::new("alice");
        assert!(registry.is_authorized(&alice, &alice));
        assert!(!registry.is_authorized(&alice, &Account::new("bob")));
    }

    #[test]
    fn test_add_remove_round_trip() {
        let mut registry = AuthorizationRegistry::new();
        let alice = Account::new("alice");
        let bob = Account::new("bob");

        registry.add_operator(&alice, &bob);
        registry.add_operator(&alice, &bob);
        assert!(registry.is_authorized(&alice, &bob));
        assert!(!registry.is_authorized(&bob, &alice));
        assert_eq!(registry.operator_count(), 1);

        registry.remove_operator(&alice, &bob);
        assert!(!registry.is_authorized(&alice, &bob));
        assert_eq!(registry.operator_count(), 0);
        assert!(registry.owners().is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut registry = AuthorizationRegistry::new();
        registry.remove_operator(&Account::new("alice"), &Account::new("bob"));
        assert_eq!(registry.operator_count(), 0);
    }

    #[test]
    fn test_operators_sorted() {
        let mut registry = AuthorizationRegistry::new();
        let alice = Account::new("alice");
        registry.add_operator(&alice, &Account::new("carol"));
        registry.add_operator(&alice, &Account::new("bob"));
        assert_eq!(
            registry.operators_of(&alice),
            vec![Account::new("bob"), Account::new("carol")]
        );
    }
}
