// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 0 - Enhancement
//!
//! The only stage with no upstream checkpoint (spec.md §3: "a Run starts
//! by seeding stage 0 with `(Session, runConfig)`"). Validates the seeded
//! session, trims incidental whitespace from free-text fields, and snapshots
//! the run configuration alongside it so every later stage's metadata can
//! trace back to the options the run started with. Skippable via
//! `flags.skipEnhancement`, in which case the session passes through
//! unmodified.

use crate::config::RunConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfarer_pipeline_domain::entities::{Checkpoint, RunManifest, Session, StageMetadata};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementOutput {
    pub session: Session,
    pub run_config: serde_json::Value,
}

pub struct EnhancementStage {
    session: Session,
    run_config: RunConfig,
}

impl EnhancementStage {
    pub fn new(session: Session, run_config: RunConfig) -> Self {
        Self { session, run_config }
    }

    fn validate(session: &Session) -> Result<(), PipelineError> {
        if session.title.trim().is_empty() {
            return Err(PipelineError::ValidationError("session title must not be empty".into()));
        }
        if session.date_range.end < session.date_range.start {
            return Err(PipelineError::ValidationError("date_range.end is before date_range.start".into()));
        }
        Ok(())
    }

    fn enhance(mut session: Session) -> Session {
        session.title = session.title.trim().to_string();
        session.destinations = session.destinations.into_iter().map(|d| d.trim().to_string()).filter(|d| !d.is_empty()).collect();
        session.interests = session.interests.into_iter().map(|i| i.trim().to_string()).filter(|i| !i.is_empty()).collect();
        session
    }
}

#[async_trait]
impl Stage for EnhancementStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(0).expect("stage 0 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        Self::validate(&self.session)?;
        let session = if self.run_config.flags.skip_enhancement {
            self.session.clone()
        } else {
            Self::enhance(self.session.clone())
        };

        let output = EnhancementOutput {
            session,
            run_config: serde_json::to_value(&self.run_config)?,
        };
        let meta = StageMetadata::new(0, ctx.session_id.clone(), ctx.run_id.clone(), None, Some(output.run_config.clone()))?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, output)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({ "session": self.session, "run_config": serde_json::Value::Null })
    }
}
