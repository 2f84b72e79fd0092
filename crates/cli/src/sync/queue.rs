// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for mutations not yet applied to the remote document.
//!
//! The queue is an ordered list of [`QueueOperation`]s persisted as one JSON
//! array under [`QUEUE_KEY`]. Every change is written through to the store
//! before the call returns; a failed write leaves the in-memory queue as it
//! was.
//!
//! - Operations with the same `(type, id)` coalesce in place.
//! - The queue is bounded; overflow evicts from the head.
//! - Failed operations back off on the same curve as network retries and are
//!   dropped once their per-type ceiling is reached.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_core::{
    ClassifiedError, ClockSource, ErrorCategory, KeyValueStore, OpKind, QueueOperation, StoreError,
};

use super::retry::{calculate_delay, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};

pub const QUEUE_KEY: &str = "shelf.offline_queue";
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueueError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueueError::Store(e) => e.category(),
            QueueError::Serialization(_) => ErrorCategory::Storage,
        }
    }
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Attempts allowed per operation type before it is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryCeilings {
    pub add: u32,
    pub update: u32,
    pub delete: u32,
    pub sync: u32,
}

impl Default for RetryCeilings {
    fn default() -> Self {
        RetryCeilings { add: 3, update: 3, delete: 5, sync: 5 }
    }
}

impl RetryCeilings {
    pub fn for_kind(&self, kind: OpKind) -> u32 {
        match kind {
            OpKind::Add => self.add,
            OpKind::Update => self.update,
            OpKind::Delete => self.delete,
            OpKind::Sync => self.sync,
        }
    }
}

/// Configuration for the offline queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_size: usize,
    /// First backoff step between attempts of one operation.
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub ceilings: RetryCeilings,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_size: DEFAULT_MAX_QUEUE_SIZE,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            ceilings: RetryCeilings::default(),
        }
    }
}

/// What [`OfflineQueue::enqueue`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnqueueOutcome {
    /// An operation with the same identity was updated in place.
    pub coalesced: bool,
    /// Operations evicted from the head to respect the size bound.
    pub evicted: usize,
}

/// Failure of one operation during [`OfflineQueue::process_queue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFailure {
    pub kind: OpKind,
    pub id: String,
    /// `queue_exhausted` when the operation was dropped.
    pub category: ErrorCategory,
    pub message: String,
    pub dropped: bool,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<OperationFailure>,
}

impl ProcessReport {
    /// Operations dropped after reaching their ceiling.
    pub fn dropped(&self) -> impl Iterator<Item = &OperationFailure> {
        self.errors.iter().filter(|e| e.dropped)
    }
}

/// Queue contents summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: usize,
    pub by_kind: BTreeMap<OpKind, usize>,
    /// Operations that failed at least once.
    pub failing: usize,
    pub retryable: usize,
    pub oldest_queued_at: Option<DateTime<Utc>>,
}

/// Applies one queued operation to the remote side.
pub trait QueueProcessor: Send {
    fn process<'a>(
        &'a mut self,
        op: &'a QueueOperation,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClassifiedError>> + Send + 'a>>;
}

impl<F> QueueProcessor for F
where
    F: FnMut(&QueueOperation) -> Result<(), ClassifiedError> + Send,
{
    fn process<'a>(
        &'a mut self,
        op: &'a QueueOperation,
    ) -> Pin<Box<dyn Future<Output = Result<(), ClassifiedError>> + Send + 'a>> {
        let result = self(op);
        Box::pin(std::future::ready(result))
    }
}

/// Durable, bounded, coalescing queue of pending mutations.
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn ClockSource>,
    config: QueueConfig,
    ops: Vec<QueueOperation>,
}

impl OfflineQueue {
    /// Opens the queue persisted in `store`.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn ClockSource>,
        config: QueueConfig,
    ) -> QueueResult<Self> {
        let ops = match store.get(QUEUE_KEY)? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)?,
            _ => Vec::new(),
        };
        Ok(OfflineQueue { store, clock, config, ops })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued operations in FIFO order.
    pub fn operations(&self) -> &[QueueOperation] {
        &self.ops
    }

    /// Applies `change` and persists, restoring the previous contents if the
    /// write fails.
    fn commit<R>(&mut self, change: impl FnOnce(&mut Vec<QueueOperation>) -> R) -> QueueResult<R> {
        let previous = self.ops.clone();
        let result = change(&mut self.ops);
        let written = serde_json::to_string(&self.ops)
            .map_err(QueueError::from)
            .and_then(|json| Ok(self.store.set(QUEUE_KEY, &json)?));
        match written {
            Ok(()) => Ok(result),
            Err(e) => {
                self.ops = previous;
                Err(e)
            }
        }
    }

    /// Adds `op`, or replaces the payload of the queued operation with the
    /// same identity without moving it.
    pub fn enqueue(&mut self, op: QueueOperation) -> QueueResult<EnqueueOutcome> {
        let max_size = self.config.max_size.max(1);
        let outcome = self.commit(|ops| {
            let mut outcome = EnqueueOutcome::default();
            if let Some(existing) = ops.iter_mut().find(|o| o.same_identity(&op)) {
                existing.data = op.data;
                existing.queued_at = op.queued_at;
                outcome.coalesced = true;
                return outcome;
            }
            ops.push(op);
            while ops.len() > max_size {
                let evicted = ops.remove(0);
                tracing::warn!("queue full, evicted {} {}", evicted.kind, evicted.id);
                outcome.evicted += 1;
            }
            outcome
        })?;
        tracing::debug!("queued operation ({} pending)", self.ops.len());
        Ok(outcome)
    }

    /// Removes and returns the oldest operation.
    pub fn dequeue(&mut self) -> QueueResult<Option<QueueOperation>> {
        if self.ops.is_empty() {
            return Ok(None);
        }
        self.commit(|ops| Some(ops.remove(0)))
    }

    /// Removes the operation with the given identity.
    pub fn remove(&mut self, kind: OpKind, id: &str) -> QueueResult<Option<QueueOperation>> {
        let Some(index) = self.ops.iter().position(|o| o.identity() == (kind, id)) else {
            return Ok(None);
        };
        self.commit(|ops| Some(ops.remove(index)))
    }

    pub fn clear(&mut self) -> QueueResult<()> {
        self.commit(Vec::clear)
    }

    /// Records a failed attempt of `op`.
    ///
    /// Returns true while the operation stays queued for another attempt,
    /// false once it reached its ceiling and was removed.
    pub fn mark_operation_failed(&mut self, op: &QueueOperation, error: &str) -> QueueResult<bool> {
        let Some(index) = self.ops.iter().position(|o| o.same_identity(op)) else {
            return Ok(false);
        };
        let ceiling = self.config.ceilings.for_kind(op.kind);
        let now = self.clock.now();

        let keep = self.commit(|ops| {
            let queued = &mut ops[index];
            queued.retry_count += 1;
            queued.last_error = Some(error.to_string());
            queued.last_retry_at = Some(now);
            if queued.retry_count >= ceiling {
                ops.remove(index);
                false
            } else {
                true
            }
        })?;

        if !keep {
            tracing::warn!("dropping {} {} after {} attempts: {}", op.kind, op.id, ceiling, error);
        }
        Ok(keep)
    }

    /// Whether `op` has waited out its backoff.
    fn is_retryable(&self, op: &QueueOperation, now: DateTime<Utc>) -> bool {
        let Some(last_retry) = op.last_retry_at else {
            return true;
        };
        let delay = calculate_delay(op.retry_count, self.config.base_delay, self.config.max_delay);
        let Ok(delay) = chrono::Duration::from_std(delay) else {
            return false;
        };
        now - last_retry >= delay
    }

    /// Operations due for an attempt now, in FIFO order.
    pub fn retryable_operations(&self) -> Vec<QueueOperation> {
        let now = self.clock.now();
        self.ops.iter().filter(|op| self.is_retryable(op, now)).cloned().collect()
    }

    /// Runs every due operation through `processor`.
    ///
    /// Successes are removed, failures are recorded against their ceiling.
    /// A failing operation never stops the pass.
    pub async fn process_queue<P>(&mut self, processor: &mut P) -> QueueResult<ProcessReport>
    where
        P: QueueProcessor + ?Sized,
    {
        let batch = self.retryable_operations();
        let mut report = ProcessReport { processed: batch.len(), ..ProcessReport::default() };

        for op in &batch {
            match processor.process(op).await {
                Ok(()) => {
                    self.remove(op.kind, &op.id)?;
                    report.succeeded += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    let keep = self.mark_operation_failed(op, &e.to_string())?;
                    report.errors.push(OperationFailure {
                        kind: op.kind,
                        id: op.id.clone(),
                        category: if keep { e.category } else { ErrorCategory::QueueExhausted },
                        message: e.to_string(),
                        dropped: !keep,
                    });
                }
            }
        }

        if report.processed > 0 {
            tracing::debug!(
                "queue pass: {} processed, {} succeeded, {} failed",
                report.processed,
                report.succeeded,
                report.failed
            );
        }
        Ok(report)
    }

    pub fn stats(&self) -> QueueStats {
        let now = self.clock.now();
        let mut by_kind = BTreeMap::new();
        for op in &self.ops {
            *by_kind.entry(op.kind).or_insert(0) += 1;
        }
        QueueStats {
            total: self.ops.len(),
            by_kind,
            failing: self.ops.iter().filter(|op| op.retry_count > 0).count(),
            retryable: self.ops.iter().filter(|op| self.is_retryable(op, now)).count(),
            oldest_queued_at: self.ops.iter().map(|op| op.queued_at).min(),
        }
    }
}
