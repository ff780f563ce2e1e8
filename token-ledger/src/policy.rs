//! Account validity policies
//!
//! What makes an account an invalid transfer destination or operator-list
//! owner is deployment-defined. The executor only asks the policy; it never
//! hard-codes a rule.

use crate::{config::PolicyConfig, types::Account};
use std::collections::HashSet;
use std::fmt;

/// Pluggable validity predicate for destinations and owners
pub trait AccountPolicy: fmt::Debug + Send + Sync {
    /// Whether `account` may receive a transfer
    fn is_valid_destination(&self, account: &Account) -> bool;

    /// Whether `account` may own an operator list
    fn is_valid_owner(&self, account: &Account) -> bool;
}

/// Accepts every account
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccountPolicy for AllowAll {
    fn is_valid_destination(&self, _account: &Account) -> bool {
        true
    }

    fn is_valid_owner(&self, _account: &Account) -> bool {
        true
    }
}

/// Rejects the anonymous principal (optionally) and a configured deny list
#[derive(Debug, Clone, Default)]
pub struct StandardPolicy {
    reject_anonymous: bool,
    blocked: HashSet<Account>,
}

impl StandardPolicy {
    /// Build from configuration
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            reject_anonymous: config.reject_anonymous,
            blocked: config.blocked_accounts.iter().cloned().collect(),
        }
    }

    fn accepts(&self, account: &Account) -> bool {
        if account.as_str().is_empty() {
            return false;
        }
        if self.reject_anonymous && account.is_anonymous() {
            return false;
        }
        !self.blocked.contains(account)
    }
}

impl AccountPolicy for StandardPolicy {
    fn is_valid_destination(&self, account: &Account) -> bool {
        self.accepts(account)
    }

    fn is_valid_owner(&self, account: &Account) -> bool {
        self.accepts(account)
    }
}
