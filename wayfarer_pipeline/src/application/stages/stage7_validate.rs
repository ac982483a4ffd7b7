// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 7 - Validator
//!
//! Fact-checks the top-K candidates whose origin makes them least
//! trustworthy on their own (video, or web with a single source), per
//! spec.md §4.8. Every other candidate passes through unchanged. A
//! fact-check call failure degrades that one candidate to
//! `{status: unverified}` rather than failing the stage - the stage
//! itself only errors if the upstream checkpoint is unreadable.

use crate::infrastructure::concurrency::{RetryPolicy, RetryableKind};
use crate::infrastructure::providers::FactChecker;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use wayfarer_pipeline_domain::entities::{Candidate, Checkpoint, Origin, RunManifest, StageMetadata, Validation, ValidationStatus};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

const DEFAULT_TOP_K: usize = 10;
const CALL_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateStats {
    pub candidates_considered: usize,
    pub candidates_checked: usize,
    pub verified: usize,
    pub degraded: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateOutput {
    pub candidates: Vec<Candidate>,
    pub stats: ValidateStats,
}

pub struct ValidateStage {
    checker: Arc<dyn FactChecker>,
    top_k: usize,
    retry_policy: RetryPolicy,
}

impl ValidateStage {
    pub fn new(checker: Arc<dyn FactChecker>, top_k: usize) -> Self {
        Self {
            checker,
            top_k,
            retry_policy: RetryPolicy::standard(),
        }
    }

    /// A candidate needs external fact-checking if its own evidence is
    /// thin: video origin, or web origin backed by a single source
    /// (spec.md §4.8).
    fn needs_validation(candidate: &Candidate) -> bool {
        match candidate.origin {
            Origin::Youtube => true,
            Origin::Web => candidate.source_refs.len() == 1,
            Origin::Places => false,
        }
    }

    async fn check_with_retry(&self, candidate: &Candidate) -> Result<Validation, PipelineError> {
        let mut attempt = 0;
        loop {
            let call = self.checker.check(&candidate.title, &candidate.summary);
            match tokio::time::timeout(CALL_TIMEOUT, call).await {
                Ok(Ok(result)) => {
                    return Ok(Validation {
                        status: result.status,
                        notes: result.notes,
                        sources: result.sources,
                    })
                }
                Ok(Err(err)) => {
                    let kind = RetryableKind::from_message(&err.to_string());
                    if self.retry_policy.should_retry(attempt, &kind) {
                        tokio::time::sleep(self.retry_policy.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
                Err(_) => return Err(PipelineError::TimeoutError(format!("fact-check for '{}' timed out", candidate.title))),
            }
        }
    }
}

#[async_trait]
impl Stage for ValidateStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(7).expect("stage 7 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![6]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<Vec<Candidate>> = ctx.store.read(&StageId::for_stage_number(6)?).await?;
        let mut candidates = upstream.data;

        let k = self.top_k.min(candidates.len());
        let mut stats = ValidateStats {
            candidates_considered: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates.iter_mut().take(k) {
            if !Self::needs_validation(candidate) {
                continue;
            }
            stats.candidates_checked += 1;
            match self.check_with_retry(candidate).await {
                Ok(validation) => {
                    if validation.status == ValidationStatus::Verified {
                        stats.verified += 1;
                    }
                    candidate.validation = Some(validation);
                }
                Err(err) => {
                    tracing::warn!(candidate = %candidate.candidate_id, error = %err, "fact-check failed, degrading validation");
                    stats.degraded += 1;
                    candidate.validation = Some(Validation {
                        status: ValidationStatus::Unverified,
                        notes: Some(err.to_string()),
                        sources: Vec::new(),
                    });
                }
            }
        }

        let output = ValidateOutput { candidates, stats };
        let meta = StageMetadata::new(7, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(6)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, output)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({"candidates": [], "stats": ValidateStats::default()})
    }
}

impl Default for ValidateStage {
    fn default() -> Self {
        Self::new(Arc::new(crate::infrastructure::providers::FakeFactChecker::new()), DEFAULT_TOP_K)
    }
}
