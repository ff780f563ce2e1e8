//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//! Every collector registers into the instance's own registry, so several
//! ledgers (and tests) can coexist in one process.
//!
//! # Metrics
//!
//! - `ledger_batches_total{kind,outcome}` - Mutating batches by result
//! - `ledger_batch_rejections_total{reason}` - Rejected batches by error
//! - `ledger_batch_size` - Histogram of requests per batch
//! - `ledger_transfers_applied_total` - Transfers committed
//! - `ledger_operator_updates_applied_total` - Operator changes committed
//! - `ledger_tokens` - Registered token types

use crate::{types::BatchKind, Error, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Batches by kind and outcome
    pub batches_total: IntCounterVec,

    /// Rejections by reason
    pub rejections_total: IntCounterVec,

    /// Requests per batch
    pub batch_size: Histogram,

    /// Transfers committed
    pub transfers_applied: IntCounter,

    /// Operator changes committed
    pub operator_updates_applied: IntCounter,

    /// Registered token types
    pub tokens: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let batches_total = IntCounterVec::new(
            Opts::new("ledger_batches_total", "Mutating batches by kind and outcome"),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(batches_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("ledger_batch_rejections_total", "Rejected batches by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new("ledger_batch_size", "Histogram of requests per batch")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]),
        )?;
        registry.register(Box::new(batch_size.clone()))?;

        let transfers_applied = IntCounter::new(
            "ledger_transfers_applied_total",
            "Total transfers committed",
        )?;
        registry.register(Box::new(transfers_applied.clone()))?;

        let operator_updates_applied = IntCounter::new(
            "ledger_operator_updates_applied_total",
            "Total operator changes committed",
        )?;
        registry.register(Box::new(operator_updates_applied.clone()))?;

        let tokens = IntGauge::new("ledger_tokens", "Registered token types")?;
        registry.register(Box::new(tokens.clone()))?;

        Ok(Self {
            batches_total,
            rejections_total,
            batch_size,
            transfers_applied,
            operator_updates_applied,
            tokens,
            registry,
        })
    }

    /// Record a committed batch
    pub fn record_commit(&self, kind: BatchKind, size: usize, applied: usize) {
        self.batches_total
            .with_label_values(&[kind.label(), "committed"])
            .inc();
        self.batch_size.observe(size as f64);

        match kind {
            BatchKind::Transfer => self.transfers_applied.inc_by(applied as u64),
            BatchKind::UpdateOperator => self.operator_updates_applied.inc_by(applied as u64),
        }
    }

    /// Record a rejected batch
    pub fn record_rejection(&self, kind: BatchKind, size: usize, error: &Error) {
        self.batches_total
            .with_label_values(&[kind.label(), "rejected"])
            .inc();
        self.rejections_total
            .with_label_values(&[error.kind()])
            .inc();
        self.batch_size.observe(size as f64);
    }

    /// Update registered token count
    pub fn set_tokens(&self, count: usize) {
        self.tokens.set(count as i64);
    }

    /// Render all metrics in the text exposition format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Metrics(e.to_string()))
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("transfers_applied", &self.transfers_applied.get())
            .field("operator_updates_applied", &self.operator_updates_applied.get())
            .field("tokens", &self.tokens.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenId;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.transfers_applied.get(), 0);
        assert_eq!(metrics.tokens.get(), 0);

        // A second instance must not collide
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_record_commit() {
        let metrics = Metrics::new().unwrap();
        metrics.record_commit(BatchKind::Transfer, 3, 3);
        metrics.record_commit(BatchKind::UpdateOperator, 1, 2);

        assert_eq!(metrics.transfers_applied.get(), 3);
        assert_eq!(metrics.operator_updates_applied.get(), 2);
        assert_eq!(
            metrics
                .batches_total
                .with_label_values(&["transfer", "committed"])
                .get(),
            1
        );
    }

    #[test]
    fn test_record_rejection() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection(BatchKind::Transfer, 2, &Error::InvalidToken(TokenId::new(2)));

        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["invalid_token"])
                .get(),
            1
        );
        assert_eq!(metrics.transfers_applied.get(), 0);
    }

    #[test]
    fn test_gather_text() {
        let metrics = Metrics::new().unwrap();
        metrics.set_tokens(4);
        let text = metrics.gather_text().unwrap();
        assert!(text.contains("ledger_tokens 4"));
    }
}
