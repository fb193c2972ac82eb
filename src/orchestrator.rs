//! # Request Orchestration Module
//!
//! ## Purpose
//! Serializes, rate-limits and concurrency-limits outbound generation
//! requests. Every request passes a FIFO rate gate enforcing a minimum
//! spacing between request starts, then a semaphore enforcing the in-flight
//! ceiling, then a retry loop around the underlying generation call.
//!
//! ## Input/Output Specification
//! - **Input**: Request closures producing generation futures
//! - **Output**: Settled results after rate gating, retries and slot release
//! - **Ordering**: FIFO dispatch into the rate gate; completion order is not
//!   guaranteed once multiple requests are in flight
//!
//! ## Key Features
//! - Fair async mutex as the FIFO rate gate; spacing measured start-to-start
//! - Last-request timestamp persisted so spacing survives restarts
//! - Operator unlock suspends spacing (and resets the timer) while the
//!   concurrency ceiling stays enforced
//! - Exponential backoff on transient failures only
//! - Slot release and counter decrement guaranteed by drop guards
//!
//! ## State Machine
//! Queued → RateGated → InFlight → {Succeeded | Retrying → InFlight | Failed}

use crate::errors::{AssistError, Result};
use crate::config::OrchestratorConfig;
use crate::storage::KvStore;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::time::{sleep, Instant};
use uuid::Uuid;

const LAST_REQUEST_KEY: &str = "rate:last_request_ms";
const UNLOCKED_KEY: &str = "rate:unlocked";

/// Mutable rate state owned by one orchestrator instance.
///
/// Kept behind a mutex so a multi-threaded runtime cannot race the counter
/// updates; all mutations happen synchronously at suspension boundaries.
struct RateState {
    /// Start instant of the most recent request, monotonic
    last_started: Option<Instant>,
    /// Number of requests currently in flight
    active: usize,
    /// Operator override suspending the spacing rule
    unlocked: bool,
}

/// Snapshot of the orchestrator's rate state, safe to poll every second
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    /// Whether the next request would currently wait on the rate gate
    pub is_limited: bool,
    /// Seconds until the rate gate opens (rounded up)
    pub remaining_seconds: u64,
    /// Whether the operator unlock is active
    pub is_unlocked: bool,
    /// Requests currently in flight
    pub active_requests: usize,
}

/// Decrements the active counter on drop, so the slot accounting survives
/// every exit path including errors.
struct ActiveGuard {
    state: Arc<Mutex<RateState>>,
}

impl ActiveGuard {
    fn enter(state: &Arc<Mutex<RateState>>) -> Self {
        state.lock().active += 1;
        Self {
            state: state.clone(),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
    }
}

/// Rate-limiting and concurrency-limiting front of the generation backend
pub struct RequestOrchestrator {
    config: OrchestratorConfig,
    state: Arc<Mutex<RateState>>,
    /// Fair mutex: waiters acquire in FIFO order, which is what makes the
    /// dispatch order match submission order.
    gate: AsyncMutex<()>,
    slots: Arc<Semaphore>,
    store: Arc<dyn KvStore>,
}

impl RequestOrchestrator {
    /// Create an orchestrator, reloading persisted rate state from the store
    pub fn new(config: OrchestratorConfig, store: Arc<dyn KvStore>) -> Self {
        let unlocked = matches!(store.get(UNLOCKED_KEY), Ok(Some(ref v)) if v == "true");

        // Seed the monotonic spacing timer from the persisted wall-clock
        // timestamp so spacing carries across restarts.
        let interval = Duration::from_secs(config.min_interval_seconds);
        let last_started = store
            .get(LAST_REQUEST_KEY)
            .ok()
            .flatten()
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|last_ms| {
                let elapsed_ms = Utc::now().timestamp_millis().saturating_sub(last_ms);
                if elapsed_ms <= 0 {
                    // Persisted timestamp in the future: clock moved, treat
                    // the last request as having just started.
                    return Some(Instant::now());
                }
                let elapsed = Duration::from_millis(elapsed_ms as u64);
                if elapsed < interval {
                    Instant::now().checked_sub(elapsed)
                } else {
                    None
                }
            });

        if unlocked {
            tracing::info!("Orchestrator starting with persisted unlock active");
        }

        Self {
            slots: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
            state: Arc::new(Mutex::new(RateState {
                last_started,
                active: 0,
                unlocked,
            })),
            gate: AsyncMutex::new(()),
            store,
        }
    }

    /// Run one generation request through the rate gate, the concurrency
    /// ceiling and the retry loop.
    ///
    /// The request closure is re-invoked on transient failures, so it must
    /// be callable multiple times. An error settles only this caller; the
    /// gate and the queue behind it are unaffected.
    pub async fn execute<F, Fut, T>(&self, request: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let ticket = Uuid::new_v4();
        tracing::debug!("Request {} queued", ticket);

        self.pass_rate_gate().await;

        let _permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AssistError::Internal {
                message: "concurrency semaphore closed".to_string(),
            })?;
        let _active = ActiveGuard::enter(&self.state);
        tracing::debug!("Request {} in flight", ticket);

        let result = self.run_with_retry(&request).await;
        match &result {
            Ok(_) => tracing::debug!("Request {} succeeded", ticket),
            Err(e) => tracing::debug!("Request {} failed: {}", ticket, e),
        }
        // Permit and active guard drop here on every path.
        result
    }

    /// Wait until the minimum spacing since the previous request start has
    /// elapsed, then mark this request's start.
    ///
    /// The gate is held for the whole wait, which is what spaces queued
    /// requests start-to-start instead of releasing them in a burst.
    async fn pass_rate_gate(&self) {
        let _gate = self.gate.lock().await;
        loop {
            let wait = {
                let state = self.state.lock();
                if state.unlocked {
                    None
                } else {
                    let interval = Duration::from_secs(self.config.min_interval_seconds);
                    state
                        .last_started
                        .and_then(|started| interval.checked_sub(started.elapsed()))
                        .filter(|d| !d.is_zero())
                }
            };
            match wait {
                Some(delay) => sleep(delay).await,
                None => break,
            }
        }

        self.state.lock().last_started = Some(Instant::now());
        self.persist_last_request();
    }

    async fn run_with_retry<F, Fut, T>(&self, request: &F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_millis(self.config.retry_initial_delay_ms);
        let mut attempt = 0u32;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "Transient generation failure (attempt {}/{}), backing off {:?}: {}",
                        attempt,
                        self.config.retry_attempts,
                        delay,
                        err
                    );
                    sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Suspend the spacing rule and reset the spacing timer.
    ///
    /// Credential verification happens out of band; this only flips the
    /// persisted state. The concurrency ceiling stays enforced.
    pub fn unlock(&self) {
        {
            let mut state = self.state.lock();
            state.unlocked = true;
            // Reset the timer so the next call after unlock is not penalized.
            state.last_started = None;
        }
        if let Err(e) = self.store.set(UNLOCKED_KEY, "true") {
            tracing::warn!("Failed to persist unlock state: {}", e);
        }
        if let Err(e) = self.store.remove(LAST_REQUEST_KEY) {
            tracing::warn!("Failed to clear persisted request timestamp: {}", e);
        }
        tracing::info!("Rate gate unlocked by operator");
    }

    /// Restore the spacing rule
    pub fn lock(&self) {
        self.state.lock().unlocked = false;
        if let Err(e) = self.store.set(UNLOCKED_KEY, "false") {
            tracing::warn!("Failed to persist lock state: {}", e);
        }
        tracing::info!("Rate gate restored");
    }

    /// Side-effect-free snapshot of the rate state
    pub fn status(&self) -> OrchestratorStatus {
        let state = self.state.lock();
        let remaining = if state.unlocked {
            Duration::ZERO
        } else {
            let interval = Duration::from_secs(self.config.min_interval_seconds);
            state
                .last_started
                .and_then(|started| interval.checked_sub(started.elapsed()))
                .unwrap_or(Duration::ZERO)
        };

        OrchestratorStatus {
            is_limited: !remaining.is_zero(),
            remaining_seconds: remaining.as_secs_f64().ceil() as u64,
            is_unlocked: state.unlocked,
            active_requests: state.active,
        }
    }

    fn persist_last_request(&self) {
        let now_ms = Utc::now().timestamp_millis();
        if let Err(e) = self.store.set(LAST_REQUEST_KEY, &now_ms.to_string()) {
            tracing::warn!("Failed to persist request timestamp: {}", e);
        }
    }
}
