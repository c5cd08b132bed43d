//! Bounded retry with exponential backoff at the store boundary.
//!
//! [`RetryingStore`] wraps any [`PositionStore`] and re-issues data
//! statements that failed with a retryable [`DbError`]. The default policy
//! makes a single attempt, so storage errors surface immediately unless a
//! deployment opts into retries. Schema statements are never retried.

use std::time::Duration;

use birdtrack_db::{DbError, PositionStore};
use birdtrack_types::{BirdId, NewPosition, PositionRecord, TraceSink};
use chrono::NaiveDate;
use tracing::warn;

/// Default initial backoff in milliseconds.
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;

/// Default backoff cap in milliseconds.
const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

/// How many times to attempt a statement and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per statement, including the first. At least 1.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single wait.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }

    /// Set the number of attempts (clamped to at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the initial backoff and cap.
    #[must_use]
    pub const fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Wait after failed attempt number `attempt` (1-based): the initial
    /// backoff doubled per previous retry, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1_u32 << doublings)
            .min(self.max_backoff)
    }

    /// The wait before retrying after `error` on attempt `attempt`, or `None`
    /// if the error is permanent for this statement or attempts are
    /// exhausted. `idempotent` says whether a repeat of a possibly applied
    /// statement leaves the table unchanged.
    pub fn next_delay(&self, error: &DbError, attempt: u32, idempotent: bool) -> Option<Duration> {
        (error.is_retryable(idempotent) && attempt < self.max_attempts).then(|| self.backoff(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

/// A [`PositionStore`] that retries retryable data-statement failures.
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingStore<S> {
    /// Wrap `inner` with `policy`.
    pub const fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// The retry policy in force.
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Sleep before the next attempt, or hand the error back.
    async fn back_off(
        &self,
        operation: &str,
        error: DbError,
        attempt: u32,
        idempotent: bool,
    ) -> Result<(), DbError> {
        let Some(delay) = self.policy.next_delay(&error, attempt, idempotent) else {
            return Err(error);
        };
        warn!(
            operation,
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "Storage operation failed, retrying"
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

impl<S: PositionStore> PositionStore for RetryingStore<S> {
    async fn ensure_schema(&self) -> Result<(), DbError> {
        self.inner.ensure_schema().await
    }

    async fn write_position(
        &self,
        position: &NewPosition,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<(), DbError> {
        // A server-generated timestamp makes every repeat a new row.
        let idempotent = position.observed_at.is_some();
        let mut attempt: u32 = 1;
        loop {
            let sink = trace.as_mut().map(|s| &mut **s as &mut dyn TraceSink);
            match self.inner.write_position(position, sink).await {
                Ok(()) => return Ok(()),
                Err(error) => self.back_off("insert", error, attempt, idempotent).await?,
            }
            attempt = attempt.saturating_add(1);
        }
    }

    async fn list_known_birds(&self) -> Result<Vec<BirdId>, DbError> {
        let mut attempt: u32 = 1;
        loop {
            match self.inner.list_known_birds().await {
                Ok(birds) => return Ok(birds),
                Err(error) => self.back_off("select_distinct", error, attempt, true).await?,
            }
            attempt = attempt.saturating_add(1);
        }
    }

    async fn get_latest(
        &self,
        bird_id: &BirdId,
        bucket_date: NaiveDate,
        limit: u32,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<Vec<PositionRecord>, DbError> {
        let mut attempt: u32 = 1;
        loop {
            let sink = trace.as_mut().map(|s| &mut **s as &mut dyn TraceSink);
            match self.inner.get_latest(bird_id, bucket_date, limit, sink).await {
                Ok(records) => return Ok(records),
                Err(error) => self.back_off("select_latest", error, attempt, true).await?,
            }
            attempt = attempt.saturating_add(1);
        }
    }
}
