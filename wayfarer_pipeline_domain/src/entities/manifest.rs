// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Run Manifest
//!
//! The run-level index written/updated after every stage completes:
//! which stages have run, their checkpoint file paths, timing, and the
//! status the resume planner reads to decide where to pick up (spec.md
//! §4.2).

use crate::value_objects::{RunId, SessionId, StageId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stage_id: StageId,
    pub status: StageStatus,
    pub checkpoint_path: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub input_hash: Option<String>,
}

impl ManifestEntry {
    pub fn pending(stage_id: StageId) -> Self {
        Self {
            stage_id,
            status: StageStatus::Pending,
            checkpoint_path: None,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error: None,
            input_hash: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub session_id: SessionId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub stages: Vec<ManifestEntry>,
}

impl RunManifest {
    pub fn new(run_id: RunId, session_id: SessionId) -> Self {
        let now = chrono::Utc::now();
        let stages = (0..=10u8)
            .map(|n| ManifestEntry::pending(StageId::for_stage_number(n).expect("0..=10 is always valid")))
            .collect();
        Self {
            run_id,
            session_id,
            created_at: now,
            updated_at: now,
            stages,
        }
    }

    pub fn entry_mut(&mut self, stage_id: &StageId) -> Option<&mut ManifestEntry> {
        self.stages.iter_mut().find(|e| &e.stage_id == stage_id)
    }

    pub fn entry(&self, stage_id: &StageId) -> Option<&ManifestEntry> {
        self.stages.iter().find(|e| &e.stage_id == stage_id)
    }

    /// The highest-numbered stage with status `Completed`, with no gaps
    /// below it - the resume planner's starting point (spec.md §4.2).
    pub fn last_completed_stage(&self) -> Option<&ManifestEntry> {
        self.stages
            .iter()
            .take_while(|e| e.status == StageStatus::Completed)
            .last()
    }

    pub fn record_started(&mut self, stage_id: &StageId) {
        self.updated_at = chrono::Utc::now();
        if let Some(entry) = self.entry_mut(stage_id) {
            entry.status = StageStatus::Running;
            entry.started_at = Some(self.updated_at);
        }
    }

    pub fn record_completed(&mut self, stage_id: &StageId, checkpoint_path: impl Into<String>, input_hash: Option<String>) {
        let now = chrono::Utc::now();
        self.updated_at = now;
        if let Some(entry) = self.entry_mut(stage_id) {
            let duration_ms = entry.started_at.map(|s| (now - s).num_milliseconds().max(0) as u64);
            entry.status = StageStatus::Completed;
            entry.completed_at = Some(now);
            entry.duration_ms = duration_ms;
            entry.checkpoint_path = Some(checkpoint_path.into());
            entry.input_hash = input_hash;
            entry.error = None;
        }
    }

    pub fn record_failed(&mut self, stage_id: &StageId, error: impl Into<String>) {
        let now = chrono::Utc::now();
        self.updated_at = now;
        if let Some(entry) = self.entry_mut(stage_id) {
            entry.status = StageStatus::Failed;
            entry.completed_at = Some(now);
            entry.error = Some(error.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> RunManifest {
        RunManifest::new(RunId::new(), SessionId::from_string("2026-07-27-trip").unwrap())
    }

    #[test]
    fn new_manifest_has_all_eleven_stages_pending() {
        let m = manifest();
        assert_eq!(m.stages.len(), 11);
        assert!(m.stages.iter().all(|e| e.status == StageStatus::Pending));
    }

    #[test]
    fn last_completed_stage_stops_at_first_gap() {
        let mut m = manifest();
        let s0 = m.stages[0].stage_id.clone();
        let s1 = m.stages[1].stage_id.clone();
        let s3 = m.stages[3].stage_id.clone();
        m.record_completed(&s0, "checkpoints/00_enhancement.json", None);
        m.record_completed(&s1, "checkpoints/01_intent.json", None);
        // stage 2 left pending, stage 3 completed out of order - should not count
        m.record_completed(&s3, "checkpoints/03_workers.json", None);

        let last = m.last_completed_stage().unwrap();
        assert_eq!(last.stage_id.stage_number(), 1);
    }

    #[test]
    fn record_failed_sets_error_and_status() {
        let mut m = manifest();
        let s0 = m.stages[0].stage_id.clone();
        m.record_failed(&s0, "provider timeout");
        let entry = m.entry(&s0).unwrap();
        assert_eq!(entry.status, StageStatus::Failed);
        assert_eq!(entry.error.as_deref(), Some("provider timeout"));
    }
}
