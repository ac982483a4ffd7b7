// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Policy
//!
//! Shared exponential-backoff-with-jitter policy used by every provider
//! worker (spec.md §4.4). Classification and delay computation are pure
//! functions so they proptest cleanly; the actual sleep/retry loop is a
//! thin wrapper any `ProviderClient` caller can reuse.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl RetryPolicy {
    /// Defaults for most providers: base 1000ms, max 16000ms, ±500ms jitter.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 16_000,
            jitter_ms: 500,
        }
    }

    /// Defaults for lighter-weight providers (spec.md §4.4: "8000ms for
    /// lighter providers").
    pub fn light() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8_000,
            jitter_ms: 500,
        }
    }

    /// `base * 2^attempt`, capped at `max_delay_ms`, with a random additive
    /// jitter in `[-jitter_ms, +jitter_ms]` (floored at 0 so the delay is
    /// never negative).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(1u64 << attempt.min(32));
        let capped = exp.min(self.max_delay_ms);
        let jitter = if self.jitter_ms == 0 {
            0i64
        } else {
            rand::thread_rng().gen_range(-(self.jitter_ms as i64)..=(self.jitter_ms as i64))
        };
        let with_jitter = (capped as i64 + jitter).max(0) as u64;
        Duration::from_millis(with_jitter)
    }

    pub fn should_retry(&self, attempt: u32, kind: &RetryableKind) -> bool {
        attempt < self.max_retries && kind.is_retryable()
    }
}

/// Classification of a failed provider call, derived from whatever status
/// code / error text the `ProviderClient` surfaces. Network errors and
/// generic "network"/"timeout" strings, HTTP 429, and HTTP 5xx are
/// retryable; any other 4xx is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableKind {
    Network,
    RateLimited,
    ServerError,
    ClientError,
    Unknown,
}

impl RetryableKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited | Self::ServerError)
    }

    /// Classifies an HTTP status code per spec.md §4.4: 429 and
    /// 500/502/503/504 are retryable; other 4xx/5xx are not.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            500 | 502 | 503 | 504 => Self::ServerError,
            400..=499 => Self::ClientError,
            _ => Self::Unknown,
        }
    }

    /// Classifies a free-text error message when no status code is
    /// available, matching the generic "network"/"timeout" substrings
    /// spec.md §4.4 calls out.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("connection reset")
            || lower.contains("connection refused")
            || lower.contains("network")
            || lower.contains("timeout")
            || lower.contains("timed out")
        {
            Self::Network
        } else {
            Self::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_matches_spec() {
        assert_eq!(RetryableKind::from_status(429), RetryableKind::RateLimited);
        assert_eq!(RetryableKind::from_status(500), RetryableKind::ServerError);
        assert_eq!(RetryableKind::from_status(503), RetryableKind::ServerError);
        assert_eq!(RetryableKind::from_status(404), RetryableKind::ClientError);
        assert!(!RetryableKind::from_status(404).is_retryable());
        assert!(RetryableKind::from_status(502).is_retryable());
    }

    #[test]
    fn message_classification_detects_network_errors() {
        assert_eq!(RetryableKind::from_message("connection reset by peer"), RetryableKind::Network);
        assert_eq!(RetryableKind::from_message("request timed out"), RetryableKind::Network);
        assert_eq!(RetryableKind::from_message("invalid api key"), RetryableKind::Unknown);
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 16_000,
            jitter_ms: 0,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(16_000));
    }

    #[test]
    fn should_retry_respects_max_attempts_and_classification() {
        let policy = RetryPolicy::standard();
        assert!(policy.should_retry(0, &RetryableKind::ServerError));
        assert!(!policy.should_retry(3, &RetryableKind::ServerError));
        assert!(!policy.should_retry(0, &RetryableKind::ClientError));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 16_000,
            jitter_ms: 500,
        };
        for _ in 0..100 {
            let delay = policy.delay_for_attempt(0).as_millis() as i64;
            assert!((500..=1500).contains(&delay));
        }
    }
}
