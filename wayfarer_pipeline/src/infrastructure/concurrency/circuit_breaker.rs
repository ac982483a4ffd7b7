// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Circuit Breaker
//!
//! Per-provider closed/open/half-open gate. The pool consults `is_open`
//! before dispatching a worker; a skipped worker counts against neither
//! side of the breaker. State lives behind a `parking_lot::Mutex` since
//! updates are short, non-blocking critical sections (spec.md §5: "per-
//! provider locks suffice").

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct ProviderState {
    state: State,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            opened_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures while closed before the circuit opens.
    pub failure_threshold: u32,
    /// Consecutive successes while half-open before the circuit closes.
    pub success_threshold: u32,
    /// How long the circuit stays open before allowing a half-open probe.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// One breaker instance governs every provider it sees by name; providers
/// are registered lazily on first use.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    providers: Mutex<HashMap<String, ProviderState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            providers: Mutex::new(HashMap::new()),
        })
    }

    /// True if the provider's circuit is currently open (and its cooldown
    /// hasn't elapsed - once it has, the provider transitions to
    /// half-open and a single probe is allowed through).
    pub fn is_open(&self, provider: &str) -> bool {
        let mut providers = self.providers.lock();
        let state = providers.entry(provider.to_string()).or_default();
        if state.state == State::Open {
            if let Some(opened_at) = state.opened_at {
                if opened_at.elapsed() >= self.config.cooldown {
                    state.state = State::HalfOpen;
                    state.consecutive_successes = 0;
                    return false;
                }
            }
            return true;
        }
        false
    }

    pub fn record_success(&self, provider: &str) {
        let mut providers = self.providers.lock();
        let state = providers.entry(provider.to_string()).or_default();
        state.consecutive_failures = 0;
        match state.state {
            State::Closed => {}
            State::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.config.success_threshold {
                    state.state = State::Closed;
                    state.opened_at = None;
                }
            }
            State::Open => {}
        }
    }

    pub fn record_failure(&self, provider: &str) {
        let mut providers = self.providers.lock();
        let state = providers.entry(provider.to_string()).or_default();
        state.consecutive_successes = 0;
        match state.state {
            State::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    state.state = State::Open;
                    state.opened_at = Some(Instant::now());
                }
            }
            State::HalfOpen => {
                state.state = State::Open;
                state.opened_at = Some(Instant::now());
            }
            State::Open => {}
        }
    }
}
