// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Retry and circuit-breaker primitives for broker access.
//!
//! Composition in the relay: retry is the inner loop (bounded attempts with
//! exponential backoff), the breaker is the outer gate. The breaker is
//! per-relay, not global.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, VehicleError};

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            max_backoff,
        }
    }

    /// Run `op`, retrying on failure up to `max_attempts` total attempts.
    /// The backoff doubles after each failure, capped at `max_backoff`.
    /// Returns the last error once attempts are exhausted.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff;
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    debug!(attempt, error = %err, "Operation failed, retrying after backoff");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow through; failures are counted.
    Closed,
    /// Calls are rejected until the open timeout elapses.
    Open,
    /// Probe calls flow through; a failure reopens, a success streak closes.
    HalfOpen,
}

/// Circuit breaker guarding a single downstream target.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    failure_threshold: u32,
    success_threshold: u32,
    timeout: Duration,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures, stays open for `timeout`, and closes again after
    /// `success_threshold` consecutive half-open successes.
    pub fn new(failure_threshold: u32, success_threshold: u32, timeout: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            timeout,
            last_failure: None,
        }
    }

    /// Current breaker state.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Run `op` under the breaker.
    ///
    /// Open state rejects immediately with `CircuitOpen` until the timeout
    /// elapses, after which the call becomes the half-open probe.
    pub async fn execute<T, F, Fut>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.state {
            CircuitState::Closed => match op().await {
                Ok(value) => {
                    self.failure_count = 0;
                    Ok(value)
                }
                Err(err) => {
                    self.failure_count += 1;
                    self.last_failure = Some(Instant::now());
                    if self.failure_count >= self.failure_threshold {
                        warn!(failures = self.failure_count, "Circuit breaker opened");
                        self.state = CircuitState::Open;
                        self.failure_count = 0;
                    }
                    Err(err)
                }
            },
            CircuitState::Open => {
                let timed_out = self
                    .last_failure
                    .map(|at| at.elapsed() >= self.timeout)
                    .unwrap_or(true);
                if !timed_out {
                    return Err(VehicleError::CircuitOpen);
                }
                debug!("Circuit breaker half-open, probing");
                self.state = CircuitState::HalfOpen;
                self.success_count = 0;
                self.probe(op).await
            }
            CircuitState::HalfOpen => self.probe(op).await,
        }
    }

    async fn probe<T, F, Fut>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Ok(value) => {
                self.success_count += 1;
                if self.success_count >= self.success_threshold {
                    debug!("Circuit breaker closed");
                    self.state = CircuitState::Closed;
                    self.failure_count = 0;
                    self.success_count = 0;
                }
                Ok(value)
            }
            Err(err) => {
                self.state = CircuitState::Open;
                self.last_failure = Some(Instant::now());
                self.success_count = 0;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn unavailable() -> VehicleError {
        VehicleError::Broker(fleetwatch_messaging::BrokerError::Unavailable(
            "down".to_string(),
        ))
    }

    #[tokio::test]
    async fn retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(10));

        let result = policy
            .execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10));

        let result: Result<()> = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn breaker_opens_after_threshold_and_rejects_fast() {
        let mut breaker = CircuitBreaker::new(2, 1, Duration::from_secs(60));

        for _ in 0..2 {
            let _: Result<()> = breaker.execute(|| async { Err(unavailable()) }).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        // Rejected without executing the operation.
        let calls = AtomicU32::new(0);
        let result: Result<()> = breaker
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(VehicleError::CircuitOpen)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn breaker_probes_after_timeout_and_closes_on_success_streak() {
        let mut breaker = CircuitBreaker::new(1, 2, Duration::from_millis(20));

        let _: Result<()> = breaker.execute(|| async { Err(unavailable()) }).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // First probe executes the operation.
        breaker.execute(|| async { Ok(()) }).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.execute(|| async { Ok(()) }).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let mut breaker = CircuitBreaker::new(1, 2, Duration::from_millis(10));

        let _: Result<()> = breaker.execute(|| async { Err(unavailable()) }).await;
        tokio::time::sleep(Duration::from_millis(15)).await;

        let _: Result<()> = breaker.execute(|| async { Err(unavailable()) }).await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
