// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint
//!
//! The per-stage on-disk envelope: `{"_meta": StageMetadata, "data": T}`.
//! `_meta` is always parsed first (cheap, catches malformed structure
//! before attempting to deserialize the caller's `T`), per
//! `validate_checkpoint_structure` in spec.md §4.1.

use crate::error::PipelineError;
use crate::value_objects::{RunId, SessionId, StageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetadata {
    pub stage_id: StageId,
    pub stage_number: u8,
    pub stage_name: String,
    pub schema_version: u32,
    pub session_id: SessionId,
    pub run_id: RunId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub upstream_stage: Option<StageId>,
    pub config: Option<Value>,
}

impl StageMetadata {
    pub fn new(
        stage_number: u8,
        session_id: SessionId,
        run_id: RunId,
        upstream_stage: Option<StageId>,
        config: Option<Value>,
    ) -> Result<Self, PipelineError> {
        let stage_id = StageId::for_stage_number(stage_number)?;
        let stage_name = stage_id.as_str()[3..].to_string();
        Ok(Self {
            stage_id,
            stage_number,
            stage_name,
            schema_version: CURRENT_SCHEMA_VERSION,
            session_id,
            run_id,
            created_at: chrono::Utc::now(),
            upstream_stage,
            config,
        })
    }

    /// Structural validation used by `validate_checkpoint_structure`:
    /// `stageId` must be `NN_name`, `stageNumber` in 0..=10, and the two
    /// must agree.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stage_number > 10 {
            return Err(PipelineError::InvalidCheckpoint(format!(
                "stageNumber {} out of range 0..=10",
                self.stage_number
            )));
        }
        if self.stage_id.stage_number() != self.stage_number {
            return Err(PipelineError::InvalidCheckpoint(format!(
                "stageId '{}' does not match stageNumber {}",
                self.stage_id, self.stage_number
            )));
        }
        if self.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(PipelineError::InvalidCheckpoint(format!(
                "checkpoint schema version {} is newer than this reader understands ({})",
                self.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<T> {
    #[serde(rename = "_meta")]
    pub meta: StageMetadata,
    pub data: T,
}

impl<T> Checkpoint<T> {
    pub fn new(meta: StageMetadata, data: T) -> Self {
        Self { meta, data }
    }
}

/// Checks that a raw JSON value has the `{_meta, data}` shape and that
/// `_meta` passes structural validation, without deserializing `data`
/// against any particular type.
pub fn validate_checkpoint_structure(value: &Value) -> bool {
    let Some(obj) = value.as_object() else { return false };
    let Some(meta_value) = obj.get("_meta") else { return false };
    if !obj.contains_key("data") {
        return false;
    }
    match serde_json::from_value::<StageMetadata>(meta_value.clone()) {
        Ok(meta) => meta.validate().is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> StageMetadata {
        StageMetadata::new(4, SessionId::from_string("2026-07-27-trip").unwrap(), RunId::new(), None, None).unwrap()
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let m = meta();
        let json = serde_json::to_value(&m).unwrap();
        let back: StageMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back.stage_id, m.stage_id);
        assert_eq!(back.stage_number, m.stage_number);
    }

    #[test]
    fn validate_rejects_mismatched_stage_number() {
        let mut m = meta();
        m.stage_number = 5;
        assert!(m.validate().is_err());
    }

    #[test]
    fn validate_rejects_future_schema_version() {
        let mut m = meta();
        m.schema_version = CURRENT_SCHEMA_VERSION + 1;
        assert!(m.validate().is_err());
    }

    #[test]
    fn checkpoint_structure_validation() {
        let checkpoint = Checkpoint::new(meta(), serde_json::json!({"candidates": []}));
        let value = serde_json::to_value(&checkpoint).unwrap();
        assert!(validate_checkpoint_structure(&value));

        assert!(!validate_checkpoint_structure(&serde_json::json!({"data": {}})));
        assert!(!validate_checkpoint_structure(&serde_json::json!({"_meta": {}})));
        assert!(!validate_checkpoint_structure(&serde_json::json!([1, 2, 3])));
    }
}
