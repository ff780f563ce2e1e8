//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One writer task serializes every mutating batch
//! - Each batch validates and applies under one write-lock acquisition
//! - Queries bypass the mailbox and take the read lock directly
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              Transport / authentication               │
//! │        (supplies the caller as an opaque Account)     │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends batches to actor mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   write lock ─► validate batch ─► apply batch         │
//! │                       │                               │
//! │                       ▼                               │
//! │        Arc<RwLock<LedgerState>> (store + registry)   │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Shutdown closes the mailbox: batches queued before it still run, later
//! submissions fail with `Error::Concurrency`.
//!
//! A caller that gives up waiting (dropped future, external timeout) cannot
//! cause a partial commit: the actor finishes the batch or never starts it.

use crate::{
    executor::BatchExecutor,
    metrics::Metrics,
    policy::AccountPolicy,
    state::LedgerState,
    types::{Account, BatchKind, OperatorRequest, TransferRequest},
    Error, Result,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Transfer batch
    Transfer {
        caller: Account,
        requests: Vec<TransferRequest>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Operator update batch
    UpdateOperator {
        caller: Account,
        requests: Vec<OperatorRequest>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the write path
#[derive(Debug)]
pub struct LedgerActor {
    /// Shared ledger state
    state: Arc<RwLock<LedgerState>>,

    /// Destination/owner validity
    policy: Arc<dyn AccountPolicy>,

    /// Metrics, if enabled
    metrics: Option<Metrics>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        state: Arc<RwLock<LedgerState>>,
        policy: Arc<dyn AccountPolicy>,
        metrics: Option<Metrics>,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            state,
            policy,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => {
                    // Refuse new batches, finish the ones already queued
                    tracing::info!("Ledger actor shutting down");
                    self.mailbox.close();
                }

                LedgerMessage::Transfer {
                    caller,
                    requests,
                    response,
                } => {
                    let span = batch_span(BatchKind::Transfer, &caller, requests.len());
                    let result = span.in_scope(|| self.run_transfer(&caller, &requests));
                    let _ = response.send(result);
                }

                LedgerMessage::UpdateOperator {
                    caller,
                    requests,
                    response,
                } => {
                    let span = batch_span(BatchKind::UpdateOperator, &caller, requests.len());
                    let result =
                        span.in_scope(|| self.run_update_operator(&caller, &requests));
                    let _ = response.send(result);
                }
            }
        }

        tracing::info!("Ledger actor stopped");
    }

    fn run_transfer(&self, caller: &Account, requests: &[TransferRequest]) -> Result<()> {
        let executor = BatchExecutor::new(self.policy.as_ref());
        let result = {
            let mut state = self.state.write();
            executor.transfer(&mut state, caller, requests)
        };
        self.record(BatchKind::Transfer, requests.len(), result)
    }

    fn run_update_operator(&self, caller: &Account, requests: &[OperatorRequest]) -> Result<()> {
        let executor = BatchExecutor::new(self.policy.as_ref());
        let result = {
            let mut state = self.state.write();
            executor.update_operator(&mut state, caller, requests)
        };
        self.record(BatchKind::UpdateOperator, requests.len(), result)
    }

    fn record(&self, kind: BatchKind, size: usize, result: Result<usize>) -> Result<()> {
        match result {
            Ok(applied) => {
                tracing::debug!(applied, "Batch committed");
                if let Some(metrics) = &self.metrics {
                    metrics.record_commit(kind, size, applied);
                }
                Ok(())
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejection(kind, size, &err);
                }
                Err(err)
            }
        }
    }
}

fn batch_span(kind: BatchKind, caller: &Account, size: usize) -> tracing::Span {
    tracing::info_span!(
        "batch",
        batch_id = %Uuid::now_v7(),
        kind = %kind,
        caller = %caller,
        size
    )
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Submit a transfer batch
    pub async fn transfer(&self, caller: Account, requests: Vec<TransferRequest>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Transfer {
            caller,
            requests,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Submit an operator update batch
    pub async fn update_operator(
        &self,
        caller: Account,
        requests: Vec<OperatorRequest>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::UpdateOperator {
            caller,
            requests,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.send(LedgerMessage::Shutdown).await
    }

    async fn send(&self, msg: LedgerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    state: Arc<RwLock<LedgerState>>,
    policy: Arc<dyn AccountPolicy>,
    metrics: Option<Metrics>,
    mailbox_capacity: usize,
) -> (LedgerHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(state, policy, metrics, rx);

    let task = tokio::spawn(async move {
        actor.run().await;
    });

    (LedgerHandle::new(tx), task)
}
