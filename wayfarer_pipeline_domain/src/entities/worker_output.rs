// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Output & Plan
//!
//! `WorkerPlan` is the stage-2 router's output: per-provider assignments
//! for the stage-3 worker pool. `WorkerOutput` is what each worker produces
//! after the pool runs it — status plus whatever raw candidates it found,
//! ready for stage 4 normalization.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Ok,
    Partial,
    Error,
    Skipped,
}

/// One raw candidate as returned by a provider worker, prior to stage-4
/// normalization (no stable id/confidence/score assigned yet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    pub summary: String,
    pub location_text: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub tags: Vec<String>,
    pub source_url: Option<String>,
    pub publisher: Option<String>,
    pub snippet: Option<String>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOutput {
    pub worker_id: String,
    pub status: WorkerStatus,
    pub candidates: Vec<RawCandidate>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl WorkerOutput {
    pub fn ok(worker_id: impl Into<String>, candidates: Vec<RawCandidate>, duration: Duration) -> Self {
        Self {
            worker_id: worker_id.into(),
            status: WorkerStatus::Ok,
            candidates,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    pub fn error(worker_id: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            worker_id: worker_id.into(),
            status: WorkerStatus::Error,
            candidates: Vec::new(),
            duration_ms: duration.as_millis() as u64,
            error: Some(message.into()),
        }
    }

    pub fn skipped(worker_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            status: WorkerStatus::Skipped,
            candidates: Vec::new(),
            duration_ms: 0,
            error: Some(reason.into()),
        }
    }
}

/// A single provider assignment produced by the stage-2 router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub worker_id: String,
    pub provider: String,
    pub queries: Vec<String>,
    pub max_results: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPlan {
    pub assignments: Vec<WorkerAssignment>,
}
