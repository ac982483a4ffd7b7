// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 10 - Renderer
//!
//! Terminal stage: emits the canonical structured result (the stage's own
//! checkpoint) plus a human-readable markdown rendering as a side artifact
//! (spec.md §4.8 / §6 on-disk layout). Rendering is pure and deterministic -
//! the same input bytes always produce the same markdown bytes, with no
//! wall-clock or random ordering, so resumed/re-rendered runs are
//! byte-identical.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use wayfarer_pipeline_domain::entities::{Candidate, Checkpoint, RunManifest, StageMetadata};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

use super::stage9_aggregate::AggregateOutput;

/// Compact cards cap in the markdown rendering's summary section
/// (spec.md §4.8: "up to 20 compact cards").
const CARD_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedResults {
    pub candidates: Vec<Candidate>,
    pub narrative: Option<super::stage9_aggregate::Narrative>,
}

pub struct RenderStage;

impl RenderStage {
    pub fn new() -> Self {
        Self
    }

    /// Builds the hybrid markdown layout: a short summary, up to
    /// [`CARD_LIMIT`] compact cards, a full-detail appendix for everything,
    /// and a sources index. Pure function of its input so it stays
    /// deterministic across runs.
    fn render_markdown(output: &AggregateOutput) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Trip Results");
        let _ = writeln!(md);

        if let Some(narrative) = &output.narrative {
            let _ = writeln!(md, "{}", narrative.introduction);
            let _ = writeln!(md);
            for section in &narrative.sections {
                let _ = writeln!(md, "## {}", section.heading);
                let _ = writeln!(md, "{}", section.content);
                let _ = writeln!(md);
            }
        } else {
            let _ = writeln!(md, "_Narrative unavailable for this run; results are listed below._");
            let _ = writeln!(md);
        }

        let _ = writeln!(md, "## Summary");
        let _ = writeln!(md, "{} candidates, {} shown below.", output.candidates.len(), output.candidates.len().min(CARD_LIMIT));
        let _ = writeln!(md);

        let _ = writeln!(md, "## Candidates");
        for candidate in output.candidates.iter().take(CARD_LIMIT) {
            let _ = writeln!(
                md,
                "- **{}** ({:?}, score {:.0}) - {}",
                candidate.title, candidate.candidate_type, candidate.score, candidate.summary
            );
        }
        let _ = writeln!(md);

        let _ = writeln!(md, "## Full Details");
        for candidate in &output.candidates {
            let _ = writeln!(md, "### {}", candidate.title);
            let _ = writeln!(md, "- id: `{}`", candidate.candidate_id.as_str());
            let _ = writeln!(md, "- type: {:?}", candidate.candidate_type);
            let _ = writeln!(md, "- origin: {}", candidate.origin.as_str());
            let _ = writeln!(md, "- score: {:.1}", candidate.score);
            if let Some(location) = &candidate.location_text {
                let _ = writeln!(md, "- location: {location}");
            }
            if !candidate.tags.is_empty() {
                let _ = writeln!(md, "- tags: {}", candidate.tags.join(", "));
            }
            let _ = writeln!(md, "- summary: {}", candidate.summary);
            let _ = writeln!(md);
        }

        let _ = writeln!(md, "## Sources");
        for candidate in &output.candidates {
            for source in &candidate.source_refs {
                let _ = writeln!(md, "- [{}]({}) - {}", candidate.title, source.url, source.publisher.clone().unwrap_or_else(|| "unknown publisher".to_string()));
            }
        }

        md
    }
}

impl Default for RenderStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for RenderStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(10).expect("stage 10 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![9]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<AggregateOutput> = ctx.store.read(&StageId::for_stage_number(9)?).await?;

        let markdown = Self::render_markdown(&upstream.data);
        ctx.store.write_side_artifact("results.md", markdown.as_bytes()).await?;

        let results = RenderedResults {
            candidates: upstream.data.candidates,
            narrative: upstream.data.narrative,
        };

        let meta = StageMetadata::new(10, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(9)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, results)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({"candidates": [], "narrative": null})
    }
}
