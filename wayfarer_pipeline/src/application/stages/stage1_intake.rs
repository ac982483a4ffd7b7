// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 1 - Intake
//!
//! Projects the enhanced `Session` into an `EnrichedIntent` (spec.md §3)
//! by inferring extra tags from the user's free-text interests. No
//! external call is made here - intent extraction in this pipeline is a
//! local keyword pass, not an LLM call (that's stage 9's job).

use super::keywords::infer_tags;
use super::stage0_enhancement::EnhancementOutput;
use async_trait::async_trait;
use wayfarer_pipeline_domain::entities::{Checkpoint, EnrichedIntent, RunManifest, StageMetadata};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

pub struct IntakeStage;

impl Default for IntakeStage {
    fn default() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for IntakeStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(1).expect("stage 1 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![0]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<EnhancementOutput> = ctx.store.read(&StageId::for_stage_number(0)?).await?;
        let session = upstream.data.session;
        let inferred_tags = infer_tags(&session.interests);
        let intent = EnrichedIntent::from_session(session, inferred_tags);

        let meta = StageMetadata::new(1, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(0)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, intent)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": null,
            "title": "",
            "destinations": [],
            "date_range": null,
            "flexibility": null,
            "interests": [],
            "constraints": {},
            "attachments": [],
            "created_at": null,
            "inferred_tags": [],
        })
    }
}
