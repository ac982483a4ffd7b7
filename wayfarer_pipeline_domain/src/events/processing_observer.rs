// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Processing Observer
//!
//! A side-channel for progress reporting that keeps the executor free of
//! any particular rendering concern (structured logs, a terminal
//! progress bar, or a test harness's recorder can all implement this).

use crate::value_objects::StageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    Skipped,
    Failed,
}

/// Notified by the executor around each stage boundary. Implementations
/// must not block or panic - the executor does not treat observer
/// failures as pipeline failures, it only logs them.
pub trait ProcessingObserver: Send + Sync {
    fn on_stage_started(&self, stage_id: &StageId) {
        let _ = stage_id;
    }

    fn on_stage_finished(&self, stage_id: &StageId, outcome: StageOutcome, duration_ms: u64) {
        let _ = (stage_id, outcome, duration_ms);
    }

    fn on_run_finished(&self, run_succeeded: bool) {
        let _ = run_succeeded;
    }
}

/// An observer that does nothing - the default when no progress
/// reporting is wired up (e.g. library callers that only want the
/// final result).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProcessingObserver for NullObserver {}
