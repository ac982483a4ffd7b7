// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 9 - Aggregator
//!
//! Sends the top-N candidates (plus optional session context) to the
//! external narrative generator under a 20s timeout with 3 retries
//! (spec.md §4.8). On irrecoverable failure, emits a degraded output
//! (`narrative: null`) rather than failing the stage, and is the one
//! stage that writes to the shared cost tracker for LLM token usage.

use crate::infrastructure::concurrency::{RetryPolicy, RetryableKind};
use crate::infrastructure::providers::{NarrativeGenerator, NarrativeRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use wayfarer_pipeline_domain::entities::{Candidate, Checkpoint, RunManifest, StageMetadata};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::cost_tracker::CostTracker;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

const CALL_TIMEOUT: Duration = Duration::from_secs(20);
/// Estimated cost per 1k tokens for the narrative generator, used only to
/// populate the in-run cost ledger (spec.md §5's "shared resources" -
/// not a real billing reconciliation).
const COST_PER_1K_TOKENS_USD: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub heading: String,
    pub content: String,
    pub candidate_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub title: String,
    pub description: String,
    pub candidate_id: Option<String>,
    #[serde(rename = "type")]
    pub highlight_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub text: String,
    pub reasoning: String,
    pub candidate_ids: Vec<String>,
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Narrative {
    pub introduction: String,
    pub sections: Vec<NarrativeSection>,
    pub highlights: Vec<Highlight>,
    pub recommendations: Vec<Recommendation>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    pub candidate_count: usize,
    pub narrative_generated: bool,
    pub tokens_used: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateOutput {
    pub candidates: Vec<Candidate>,
    pub narrative: Option<Narrative>,
    pub stats: AggregateStats,
}

pub struct AggregateStage {
    generator: Arc<dyn NarrativeGenerator>,
    cost_tracker: Arc<Mutex<CostTracker>>,
    retry_policy: RetryPolicy,
}

impl AggregateStage {
    pub fn new(generator: Arc<dyn NarrativeGenerator>, cost_tracker: Arc<Mutex<CostTracker>>) -> Self {
        Self {
            generator,
            cost_tracker,
            retry_policy: RetryPolicy::standard(),
        }
    }

    async fn generate_with_retry(&self, request: &NarrativeRequest) -> Result<crate::infrastructure::providers::NarrativeResponse, PipelineError> {
        let mut attempt = 0;
        loop {
            let call = self.generator.generate(request);
            match tokio::time::timeout(CALL_TIMEOUT, call).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => {
                    let kind = RetryableKind::from_message(&err.to_string());
                    if self.retry_policy.should_retry(attempt, &kind) {
                        tokio::time::sleep(self.retry_policy.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
                Err(_) => return Err(PipelineError::TimeoutError("narrative generator timed out".into())),
            }
        }
    }
}

#[async_trait]
impl Stage for AggregateStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(9).expect("stage 9 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![0, 8]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<Vec<Candidate>> = ctx.store.read(&StageId::for_stage_number(8)?).await?;
        let candidates = upstream.data;

        let session_title = match ctx.store.read::<wayfarer_pipeline_domain::entities::EnrichedIntent>(&StageId::for_stage_number(1)?).await {
            Ok(intent) => intent.data.title,
            Err(_) => "Trip".to_string(),
        };

        let request = NarrativeRequest {
            session_title,
            candidate_titles: candidates.iter().map(|c| c.title.clone()).collect(),
        };

        let output = match self.generate_with_retry(&request).await {
            Ok(response) => {
                self.cost_tracker.lock().record_call("narrative_generator", response.tokens_used as f64 / 1000.0 * COST_PER_1K_TOKENS_USD);
                let candidate_ids: Vec<String> = candidates.iter().map(|c| c.candidate_id.as_str().to_string()).collect();
                let narrative = Narrative {
                    introduction: response.introduction,
                    sections: vec![NarrativeSection {
                        heading: "Highlights".to_string(),
                        content: "Curated picks for this trip.".to_string(),
                        candidate_ids: candidate_ids.clone(),
                    }],
                    highlights: candidates
                        .iter()
                        .take(5)
                        .map(|c| Highlight {
                            title: c.title.clone(),
                            description: c.summary.clone(),
                            candidate_id: Some(c.candidate_id.as_str().to_string()),
                            highlight_type: format!("{:?}", c.candidate_type).to_lowercase(),
                        })
                        .collect(),
                    recommendations: Vec::new(),
                    conclusion: response.conclusion,
                };
                AggregateOutput {
                    candidates,
                    narrative: Some(narrative),
                    stats: AggregateStats {
                        candidate_count: candidate_ids.len(),
                        narrative_generated: true,
                        tokens_used: response.tokens_used,
                    },
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "narrative generator unavailable, emitting degraded output");
                let count = candidates.len();
                AggregateOutput {
                    candidates,
                    narrative: None,
                    stats: AggregateStats {
                        candidate_count: count,
                        narrative_generated: false,
                        tokens_used: 0,
                    },
                }
            }
        };

        let meta = StageMetadata::new(9, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(8)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, output)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({"candidates": [], "narrative": null, "stats": AggregateStats::default()})
    }
}
