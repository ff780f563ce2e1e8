//! Main ledger orchestration layer
//!
//! This module ties together state, policy, actor and metrics components
//! into the boundary API: batch transfers and operator updates go through
//! the single-writer actor, batch queries read the shared state directly.
//!
//! # Example
//!
//! ```no_run
//! use token_ledger::{Account, Config, Ledger, TransferRequest};
//!
//! #[tokio::main]
//! async fn main() -> token_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     ledger
//!         .transfer(
//!             Account::new("alice"),
//!             vec![TransferRequest::new("alice", "bob", 1, 30)],
//!         )
//!         .await?;
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    metrics::Metrics,
    policy::{AccountPolicy, StandardPolicy},
    query::QueryService,
    state::{LedgerSnapshot, LedgerState},
    types::{
        Account, Balance, BalanceRequest, IsAuthorizedRequest, Metadata, OperatorRequest,
        TokenId, TokenIdentifier, TransferRequest,
    },
    Config, Error, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle for mutating batches
    handle: LedgerHandle,

    /// Actor task
    task: JoinHandle<()>,

    /// Shared state (for reads)
    state: Arc<RwLock<LedgerState>>,

    /// Metrics, if enabled
    metrics: Option<Metrics>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration, using the configured standard policy
    pub async fn open(config: Config) -> Result<Self> {
        let policy = Arc::new(StandardPolicy::from_config(&config.policy));
        Self::open_with_policy(config, policy).await
    }

    /// Open ledger with a deployment-supplied account policy
    pub async fn open_with_policy(config: Config, policy: Arc<dyn AccountPolicy>) -> Result<Self> {
        config.validate()?;

        let state = LedgerState::from_genesis(&config.genesis)?;

        let metrics = if config.metrics_enabled {
            let metrics = Metrics::new()?;
            metrics.set_tokens(state.store.token_count());
            Some(metrics)
        } else {
            None
        };

        let state = Arc::new(RwLock::new(state));
        let (handle, task) = spawn_ledger_actor(
            state.clone(),
            policy,
            metrics.clone(),
            config.mailbox_capacity,
        );

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            canister = %config.canister_id,
            "Ledger opened"
        );

        Ok(Self {
            handle,
            task,
            state,
            metrics,
            config,
        })
    }

    /// Transfer batch on behalf of `caller`, all-or-nothing
    pub async fn transfer(&self, caller: Account, requests: Vec<TransferRequest>) -> Result<()> {
        self.handle.transfer(caller, requests).await
    }

    /// Operator update batch on behalf of `caller`, all-or-nothing
    pub async fn update_operator(
        &self,
        caller: Account,
        requests: Vec<OperatorRequest>,
    ) -> Result<()> {
        self.handle.update_operator(caller, requests).await
    }

    /// Balances for every request, in request order
    pub fn get_balance(&self, requests: &[BalanceRequest]) -> Result<Vec<Balance>> {
        let state = self.state.read();
        QueryService::new(&state).get_balance(requests)
    }

    /// Metadata for every token id, in request order
    pub fn get_metadata(&self, token_ids: &[TokenId]) -> Result<Vec<Metadata>> {
        let state = self.state.read();
        QueryService::new(&state).get_metadata(token_ids)
    }

    /// Authorization for every (owner, operator) pair, in request order
    pub fn is_authorized(&self, requests: &[IsAuthorizedRequest]) -> Vec<bool> {
        let state = self.state.read();
        QueryService::new(&state).is_authorized(requests)
    }

    /// Globally unique identifier of a local token
    pub fn token_identifier(&self, token_id: TokenId) -> Result<TokenIdentifier> {
        if !self.state.read().store.token_exists(token_id) {
            return Err(Error::InvalidToken(token_id));
        }
        Ok(TokenIdentifier::new(self.config.canister_id.clone(), token_id))
    }

    /// Existing token ids, ascending
    pub fn token_ids(&self) -> Vec<TokenId> {
        self.state.read().store.token_ids()
    }

    /// Total supply of `token_id`
    pub fn total_supply(&self, token_id: TokenId) -> Result<Balance> {
        self.state.read().store.total_supply(token_id)
    }

    /// Operators of `owner`, sorted
    pub fn operators_of(&self, owner: &Account) -> Vec<Account> {
        self.state.read().registry.operators_of(owner)
    }

    /// Consistent point-in-time view of the whole ledger
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().snapshot()
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger, letting already-queued batches finish
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_with_snapshot().await.map(|_| ())
    }

    /// Shutdown ledger and return the final state
    pub async fn shutdown_with_snapshot(self) -> Result<LedgerSnapshot> {
        self.handle.shutdown().await?;
        self.task
            .await
            .map_err(|e| Error::Concurrency(format!("Ledger actor failed: {}", e)))?;
        tracing::info!("Ledger shut down");

        let snapshot = self.state.read().snapshot();
        Ok(snapshot)
    }
}
