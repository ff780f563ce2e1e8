//! Core types for the ledger
//!
//! Identifiers are immutable value types with equality, hashing and ordering
//! so they can key the balance and operator maps directly. Request and
//! response shapes are independent of any wire encoding; they derive serde
//! so a transport layer can pick its own format.

use num_bigint::BigUint;
use num_traits::{CheckedSub, ToPrimitive, Zero};
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Textual form of the anonymous principal
pub const ANONYMOUS_PRINCIPAL: &str = "2vxsx-fae";

/// Account identifier (opaque principal)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    /// Create new account
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The anonymous principal
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_PRINCIPAL.to_string())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the anonymous principal
    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_PRINCIPAL
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Account {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Token identifier, local to one ledger instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u32);

impl TokenId {
    /// Create new token id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw value
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for TokenId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token balance, an arbitrary-precision non-negative integer
///
/// Subtraction is checked and returns `None` below zero; addition cannot
/// overflow. Serialized as a decimal string so values beyond 64 bits survive
/// TOML and JSON; plain non-negative integers are accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Balance(BigUint);

impl Balance {
    /// Zero balance
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Create new balance
    pub fn new(amount: u128) -> Self {
        Self(BigUint::from(amount))
    }

    /// Underlying integer
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Value as `u128`, if it fits
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    /// Is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: &Balance) -> Option<Balance> {
        CheckedSub::checked_sub(&self.0, &other.0).map(Balance)
    }
}

impl Add<&Balance> for Balance {
    type Output = Balance;

    fn add(mut self, rhs: &Balance) -> Balance {
        self.0 += &rhs.0;
        self
    }
}

impl AddAssign<&Balance> for Balance {
    fn add_assign(&mut self, rhs: &Balance) {
        self.0 += &rhs.0;
    }
}

impl<'a> Sum<&'a Balance> for Balance {
    fn sum<I: Iterator<Item = &'a Balance>>(iter: I) -> Balance {
        iter.fold(Balance::zero(), |acc, balance| acc + balance)
    }
}

impl From<u128> for Balance {
    fn from(amount: u128) -> Self {
        Self::new(amount)
    }
}

impl From<BigUint> for Balance {
    fn from(amount: BigUint) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error parsing a `Balance` from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed balance: {0}")]
pub struct ParseBalanceError(String);

impl FromStr for Balance {
    type Err = ParseBalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BigUint>()
            .map(Balance)
            .map_err(|_| ParseBalanceError(s.to_string()))
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BalanceVisitor)
    }
}

struct BalanceVisitor;

impl<'de> Visitor<'de> for BalanceVisitor {
    type Value = Balance;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Balance, E> {
        Ok(Balance(BigUint::from(v)))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Balance, E> {
        Ok(Balance::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Balance, E> {
        u64::try_from(v)
            .map(|v| Balance(BigUint::from(v)))
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Balance, E> {
        v.parse::<Balance>()
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

/// Per-token metadata, an opaque text blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(String);

impl Metadata {
    /// Create new metadata blob
    pub fn new(blob: impl Into<String>) -> Self {
        Self(blob.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the ledger instance (canister) that issues tokens
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanisterId(String);

impl CanisterId {
    /// Create new canister id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique token reference: issuing instance plus local id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenIdentifier {
    /// Issuing ledger instance
    pub canister: CanisterId,
    /// Local token id within that instance
    pub token_id: TokenId,
}

impl TokenIdentifier {
    /// Create new token identifier
    pub fn new(canister: CanisterId, token_id: TokenId) -> Self {
        Self { canister, token_id }
    }
}

impl fmt::Display for TokenIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.canister, self.token_id)
    }
}

/// Error parsing a `TokenIdentifier` from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed token identifier: {0}")]
pub struct ParseTokenIdentifierError(String);

impl FromStr for TokenIdentifier {
    type Err = ParseTokenIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Canister ids may contain '-', never ':'; split on the last separator
        let (canister, id) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseTokenIdentifierError(s.to_string()))?;
        if canister.is_empty() {
            return Err(ParseTokenIdentifierError(s.to_string()));
        }
        let id: u32 = id
            .parse()
            .map_err(|_| ParseTokenIdentifierError(s.to_string()))?;
        Ok(Self::new(CanisterId::new(canister), TokenId::new(id)))
    }
}

/// Transfer `amount` of `token_id` from `from` to `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Debited account
    pub from: Account,
    /// Credited account
    pub to: Account,
    /// Token being moved
    pub token_id: TokenId,
    /// Amount moved
    pub amount: Balance,
}

impl TransferRequest {
    /// Create new transfer request
    pub fn new(
        from: impl Into<Account>,
        to: impl Into<Account>,
        token_id: u32,
        amount: u128,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            token_id: TokenId::new(token_id),
            amount: Balance::new(amount),
        }
    }
}

/// Balance lookup for one holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRequest {
    /// Holder
    pub user: Account,
    /// Token
    pub token_id: TokenId,
}

impl BalanceRequest {
    /// Create new balance request
    pub fn new(user: impl Into<Account>, token_id: u32) -> Self {
        Self {
            user: user.into(),
            token_id: TokenId::new(token_id),
        }
    }
}

/// Operator list mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorAction {
    /// Grant the operator permission
    AddOperator,
    /// Revoke the operator permission
    RemoveOperator,
}

/// One (operator, action) pair inside an operator request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorChange {
    /// Operator account
    pub operator: Account,
    /// Whether to add or remove it
    pub action: OperatorAction,
}

impl OperatorChange {
    /// Grant `operator`
    pub fn add(operator: impl Into<Account>) -> Self {
        Self {
            operator: operator.into(),
            action: OperatorAction::AddOperator,
        }
    }

    /// Revoke `operator`
    pub fn remove(operator: impl Into<Account>) -> Self {
        Self {
            operator: operator.into(),
            action: OperatorAction::RemoveOperator,
        }
    }
}

/// Operator list update for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRequest {
    /// Owner whose operator list is changed
    pub owner: Account,
    /// Changes, applied in order
    pub operators: Vec<OperatorChange>,
}

impl OperatorRequest {
    /// Create new operator request
    pub fn new(owner: impl Into<Account>, operators: Vec<OperatorChange>) -> Self {
        Self {
            owner: owner.into(),
            operators,
        }
    }
}

/// Authorization lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsAuthorizedRequest {
    /// Owner
    pub owner: Account,
    /// Candidate operator
    pub operator: Account,
}

impl IsAuthorizedRequest {
    /// Create new authorization request
    pub fn new(owner: impl Into<Account>, operator: impl Into<Account>) -> Self {
        Self {
            owner: owner.into(),
            operator: operator.into(),
        }
    }
}

/// Kind of mutating batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchKind {
    /// `transfer`
    Transfer,
    /// `updateOperator`
    UpdateOperator,
}

impl BatchKind {
    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            BatchKind::Transfer => "transfer",
            BatchKind::UpdateOperator => "update_operator",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
