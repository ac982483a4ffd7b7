// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 8 - Top-N Selector
//!
//! Sorts stage 7's output by final score (descending, `candidateId` as
//! the deterministic tie-break ranking already established) and takes the
//! top N, emitted as a bare candidate list (spec.md §4.8).

use async_trait::async_trait;
use wayfarer_pipeline_domain::entities::{Candidate, Checkpoint, RunManifest, StageMetadata};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

use super::stage7_validate::ValidateOutput;

pub const DEFAULT_TOP_N: usize = 50;

pub struct SelectStage {
    top_n: usize,
}

impl SelectStage {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }
}

impl Default for SelectStage {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

#[async_trait]
impl Stage for SelectStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(8).expect("stage 8 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![7]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<ValidateOutput> = ctx.store.read(&StageId::for_stage_number(7)?).await?;
        let mut candidates = upstream.data.candidates;

        candidates.sort_by(|a, b| match b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal) {
            std::cmp::Ordering::Equal => a.candidate_id.as_str().cmp(b.candidate_id.as_str()),
            other => other,
        });
        candidates.truncate(self.top_n);

        let meta = StageMetadata::new(8, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(7)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, candidates)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!([])
    }
}
