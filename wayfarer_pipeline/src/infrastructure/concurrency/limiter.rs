// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrency Limiter
//!
//! Bounds the number of workers the stage-3 fan-out runs at once. Backed by
//! a `tokio::sync::Semaphore`, which already gives FIFO queuing and RAII
//! permit release - an operation never holds a slot while queued, and a
//! slot is released on every exit path (success, error, or cancellation)
//! because the permit drops with the future.

use std::sync::Arc;
use tokio::sync::Semaphore;
use wayfarer_pipeline_domain::error::PipelineError;

/// Default bound on concurrent worker executions within stage 3 (spec
/// default: 3).
pub const DEFAULT_LIMIT: usize = 3;

#[derive(Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquires a slot, awaits `fut`, and releases the slot regardless of
    /// how `fut` completes. The permit is tied to the returned future's
    /// lifetime via `acquire_owned`, so `run` itself has no lifetime tie to
    /// `self`.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, PipelineError>
    where
        F: std::future::Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::internal_error("concurrency limiter semaphore closed"))?;
        Ok(fut.await)
    }
}
