//! Consecutive-failure circuit breaker for the mapping provider

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::Clock;
use crate::infrastructure::observability::record_circuit_state;

/// Breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Failing fast until the cooldown elapses
    Open,
    /// One probe call in flight
    HalfOpen,
}

impl CircuitState {
    fn gauge_value(&self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 1.0,
            Self::Open => 2.0,
        }
    }
}

/// Breaker thresholds
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
}

/// Opens after `failure_threshold` consecutive upstream failures and lets a
/// single probe through once `cooldown` has elapsed on the injected clock.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Whether a call may proceed; moves an expired open circuit to half-open
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let cooldown = chrono::Duration::from_std(self.config.cooldown)
                    .unwrap_or_else(|_| chrono::Duration::seconds(30));
                let elapsed = inner
                    .opened_at
                    .map(|at| self.clock.now() - at >= cooldown)
                    .unwrap_or(true);

                if elapsed {
                    info!("Circuit half-open, probing mapping provider");
                    inner.state = CircuitState::HalfOpen;
                    record_circuit_state(CircuitState::HalfOpen.gauge_value());
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();

        if inner.state != CircuitState::Closed {
            info!("Circuit closed, mapping provider recovered");
            record_circuit_state(CircuitState::Closed.gauge_value());
        }

        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;

        let should_open = inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold;

        if should_open && inner.state != CircuitState::Open {
            warn!(
                failures = inner.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "Circuit opened for mapping provider"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(self.clock.now());
            record_circuit_state(CircuitState::Open.gauge_value());
        }
    }

    /// Probe finished without an upstream verdict (auth or not-found);
    /// the provider answered, so the circuit closes.
    pub fn record_neutral(&self) {
        self.record_success();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
