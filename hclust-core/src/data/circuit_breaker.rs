//! Circuit breaker guarding a remote price provider.
//!
//! HTTP 403 trips it immediately; repeated 429s or server errors trip it after
//! `failure_threshold` consecutive failures. While open, every request is
//! refused until the cooldown has elapsed.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed { failures: u32 },
    Open { since: Instant },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<State>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            state: Mutex::new(State::Closed { failures: 0 }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    /// Lock the state, recovering it if another thread panicked mid-update.
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_allowed(&self) -> bool {
        let mut state = self.lock();
        match *state {
            State::Closed { .. } => true,
            State::Open { since } if since.elapsed() >= self.cooldown => {
                *state = State::Closed { failures: 0 };
                true
            }
            State::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if let State::Closed { failures } = &mut *state {
            *failures = 0;
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        if let State::Closed { failures } = *state {
            let failures = failures + 1;
            *state = if failures >= self.failure_threshold {
                warn!(failures, "price provider circuit breaker tripped");
                State::Open {
                    since: Instant::now(),
                }
            } else {
                State::Closed { failures }
            };
        }
    }

    /// Open immediately (IP ban).
    pub fn trip(&self) {
        warn!("price provider circuit breaker tripped by hard refusal");
        *self.lock() = State::Open {
            since: Instant::now(),
        };
    }

    pub fn remaining_cooldown(&self) -> Duration {
        match *self.lock() {
            State::Closed { .. } => Duration::ZERO,
            State::Open { since } => self.cooldown.saturating_sub(since.elapsed()),
        }
    }
}
