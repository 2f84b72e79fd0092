// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry with exponential backoff.
//!
//! Transient failures (see [`ErrorCategory::is_transient`]) are retried
//! locally and never surfaced mid-retry. Once the attempts run out, or on
//! the first non-retryable failure, the error is enhanced with the attempt
//! count and operation name and returned to the caller.
//!
//! [`ErrorCategory::is_transient`]: shelf_core::ErrorCategory::is_transient

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use shelf_core::ClassifiedError;

/// Default number of attempts for general operations.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default number of attempts for remote document calls.
pub const REMOTE_MAX_RETRIES: u32 = 3;
/// Default first backoff step.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
/// Upper bound on any single backoff.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Jitter applied to every delay, as a fraction of the delay.
const JITTER: f64 = 0.25;

/// Computes the backoff before retry number `attempt` (1-based).
///
/// `base * 2^(attempt-1)`, jittered by ±25 %, capped at `max`.
pub fn calculate_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.max(1) - 1;
    // CORRECTNESS: exponent is clamped to 30 so the cast cannot truncate
    #[allow(clippy::cast_possible_wrap)]
    let factor = 2f64.powi(exponent.min(30) as i32);
    let jitter = rand::thread_rng().gen_range(-JITTER..=JITTER);
    let millis = base.as_secs_f64() * 1_000.0 * factor * (1.0 + jitter);
    let capped = millis.clamp(0.0, max.as_secs_f64() * 1_000.0);
    // CORRECTNESS: capped is finite and within [0, max]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = capped as u64;
    Duration::from_millis(millis)
}

/// Retry policy shared by every remote call.
///
/// Clones share the in-flight tracker, so a single policy handed to several
/// components reports all of their outstanding operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    in_flight: Arc<Mutex<HashMap<String, u32>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_delay,
            max_delay: DEFAULT_MAX_DELAY,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Same timings, different attempt ceiling, shared tracker.
    pub fn with_max_retries(&self, max_retries: u32) -> Self {
        RetryPolicy { max_retries, ..self.clone() }
    }

    /// Backoff before retry number `attempt` under this policy.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_delay(attempt, self.base_delay, self.max_delay)
    }

    /// Snapshot of operations currently being attempted, keyed by
    /// `{operation_type}-{n}`, with their current attempt number.
    pub fn in_flight(&self) -> HashMap<String, u32> {
        self.tracker().clone()
    }

    fn tracker(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `operation` until it succeeds, fails permanently, or the attempt
    /// ceiling is reached.
    pub async fn execute<T, F, Fut>(
        &self,
        operation_type: &str,
        mut operation: F,
    ) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClassifiedError>>,
    {
        let key = format!("{}-{}", operation_type, self.next_id.fetch_add(1, Ordering::Relaxed));
        let max_attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.tracker().insert(key.clone(), attempt);

            match operation().await {
                Ok(value) => {
                    self.tracker().remove(&key);
                    if attempt > 1 {
                        tracing::debug!("{} succeeded after {} attempts", operation_type, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.retryable && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        "{} attempt {}/{} failed ({}), retrying in {:?}",
                        operation_type,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.tracker().remove(&key);
                    tracing::warn!(
                        "{} failed after {} attempt(s): {}",
                        operation_type,
                        attempt,
                        e
                    );
                    return Err(e.enhance(attempt, operation_type));
                }
            }
        }
    }
}
