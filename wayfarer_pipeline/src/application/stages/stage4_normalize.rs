// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 4 - Normalize
//!
//! Maps each `WorkerOutput`'s raw candidates into the uniform `Candidate`
//! shape (spec.md §4.5), dispatching per-origin rules by `workerId`
//! prefix (the same prefix stage 2 assigns: `web-N`/`places-N`/`youtube-N`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfarer_pipeline_domain::entities::{
    Candidate, CandidateMetadata, CandidateType, Checkpoint, Confidence, Coordinates, Origin, RunManifest, SourceRef, StageMetadata, WorkerOutput, WorkerStatus,
};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::{ensure_unique_ids, CandidateId, StageId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub total_candidates: usize,
    pub by_worker: std::collections::HashMap<String, usize>,
    pub by_origin: std::collections::HashMap<String, usize>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeOutput {
    pub candidates: Vec<Candidate>,
    pub stats: NormalizeStats,
}

pub struct NormalizeStage;

impl Default for NormalizeStage {
    fn default() -> Self {
        Self
    }
}

impl NormalizeStage {
    fn origin_for_worker(worker_id: &str) -> Origin {
        if worker_id.starts_with("places") {
            Origin::Places
        } else if worker_id.starts_with("youtube") {
            Origin::Youtube
        } else {
            Origin::Web
        }
    }

    fn source_ref(source_url: Option<String>, publisher: Option<String>, snippet: Option<String>) -> Vec<SourceRef> {
        match source_url {
            Some(url) => vec![SourceRef { url, publisher, retrieved_at: chrono::Utc::now(), snippet }],
            None => Vec::new(),
        }
    }

    /// `log2(1 + viewCount)` scaled into `[0, 100]`, saturating past ~10M views.
    fn view_count_score(view_count: Option<u64>) -> f64 {
        match view_count {
            Some(v) => ((1.0 + v as f64).log2() / 23.3_f64 * 100.0).clamp(0.0, 100.0),
            None => 0.0,
        }
    }

    fn rating_score(rating: Option<f64>) -> f64 {
        rating.map(|r| (r / 5.0 * 100.0).clamp(0.0, 100.0)).unwrap_or(0.0)
    }

    fn normalize_one(worker_id: &str, raw: wayfarer_pipeline_domain::entities::RawCandidate) -> Option<Candidate> {
        if raw.title.trim().is_empty() {
            return None;
        }
        let origin = Self::origin_for_worker(worker_id);
        let location_text = raw.location_text.clone().unwrap_or_default();
        let candidate_id = CandidateId::derive(origin.as_str(), &raw.title, &location_text);
        let coordinates = match (raw.lat, raw.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };

        let mut metadata = CandidateMetadata::default();
        if let Some(v) = raw.metadata.get("place_id").and_then(|v| v.as_str()) {
            metadata.place_id = Some(v.to_string());
        }
        if let Some(v) = raw.metadata.get("rating").and_then(|v| v.as_f64()) {
            metadata.rating = Some(v);
        }
        if let Some(v) = raw.metadata.get("view_count").and_then(|v| v.as_u64()) {
            metadata.view_count = Some(v);
        }
        if let Some(v) = raw.metadata.get("price_level").and_then(|v| v.as_u64()) {
            metadata.price_level = Some(v as u8);
        }
        if let Some(v) = raw.metadata.get("published_at").and_then(|v| v.as_str()) {
            metadata.published_at = chrono::DateTime::parse_from_rfc3339(v).ok().map(|d| d.with_timezone(&chrono::Utc));
        }

        let source_refs = Self::source_ref(raw.source_url, raw.publisher, raw.snippet);

        let (confidence, score) = match origin {
            Origin::Web => {
                let confidence = match source_refs.len() {
                    0 => Confidence::NeedsVerification,
                    1 => Confidence::Provisional,
                    _ => Confidence::Verified,
                };
                (confidence, 0.0)
            }
            Origin::Places => (Confidence::Verified, Self::rating_score(metadata.rating)),
            Origin::Youtube => (Confidence::Provisional, Self::view_count_score(metadata.view_count)),
        };

        let mut tags = raw.tags;
        if origin == Origin::Youtube {
            let has_social_tag = tags.iter().any(|t| t.eq_ignore_ascii_case("youtube") || t.eq_ignore_ascii_case("social"));
            if !has_social_tag {
                tags.push("youtube".to_string());
            }
        }

        Some(Candidate {
            candidate_id,
            candidate_type: infer_candidate_type(&tags),
            title: raw.title,
            summary: raw.summary,
            location_text: raw.location_text,
            coordinates,
            tags,
            origin,
            source_refs,
            confidence,
            validation: None,
            score,
            cluster_id: None,
            metadata,
        })
    }
}

/// Best-effort type inference from raw tags (spec.md leaves origin/type
/// assignment mapping to the normalizer but doesn't fully enumerate a tag
/// grammar; match against the same keyword sets the ranker and intake use).
fn infer_candidate_type(tags: &[String]) -> CandidateType {
    use super::keywords::{ACTIVITY_KEYWORDS, EXPERIENCE_KEYWORDS, FOOD_KEYWORDS};
    let lowered: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    if lowered.iter().any(|t| FOOD_KEYWORDS.iter().any(|kw| t.contains(kw))) {
        CandidateType::Food
    } else if lowered.iter().any(|t| ACTIVITY_KEYWORDS.iter().any(|kw| t.contains(kw))) {
        CandidateType::Activity
    } else if lowered.iter().any(|t| EXPERIENCE_KEYWORDS.iter().any(|kw| t.contains(kw))) {
        CandidateType::Experience
    } else if lowered.iter().any(|t| t.contains("neighborhood") || t.contains("district")) {
        CandidateType::Neighborhood
    } else if lowered.iter().any(|t| t.contains("day trip") || t.contains("daytrip") || t.contains("excursion")) {
        CandidateType::Daytrip
    } else {
        CandidateType::Place
    }
}

#[async_trait]
impl Stage for NormalizeStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(4).expect("stage 4 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![3]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<Vec<WorkerOutput>> = ctx.store.read(&StageId::for_stage_number(3)?).await?;

        let mut candidates = Vec::new();
        let mut stats = NormalizeStats::default();

        for output in &upstream.data {
            if matches!(output.status, WorkerStatus::Error | WorkerStatus::Skipped) {
                if let Some(message) = &output.error {
                    stats.errors.push(format!("{}: {message}", output.worker_id));
                }
                continue;
            }
            let mut worker_count = 0;
            for raw in output.candidates.clone() {
                if let Some(candidate) = Self::normalize_one(&output.worker_id, raw) {
                    *stats.by_origin.entry(candidate.origin.as_str().to_string()).or_insert(0) += 1;
                    candidates.push(candidate);
                    worker_count += 1;
                }
            }
            stats.by_worker.insert(output.worker_id.clone(), worker_count);
        }

        let ids = ensure_unique_ids(candidates.iter().map(|c| c.candidate_id.clone()).collect());
        for (candidate, id) in candidates.iter_mut().zip(ids) {
            candidate.candidate_id = id;
        }
        stats.total_candidates = candidates.len();

        let output = NormalizeOutput { candidates, stats };
        let meta = StageMetadata::new(4, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(3)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, output)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({ "candidates": [], "stats": NormalizeStats::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::checkpoint::FileCheckpointStore;
    use std::sync::Arc;
    use wayfarer_pipeline_domain::entities::RawCandidate;
    use wayfarer_pipeline_domain::repositories::CheckpointStore;
    use wayfarer_pipeline_domain::value_objects::{RunId, SessionId};

    fn raw(title: &str, source_url: Option<&str>) -> RawCandidate {
        RawCandidate {
            title: title.into(),
            summary: "a place".into(),
            location_text: Some("Kyoto".into()),
            lat: None,
            lng: None,
            tags: vec!["food".into()],
            source_url: source_url.map(|s| s.to_string()),
            publisher: None,
            snippet: None,
            metadata: Default::default(),
        }
    }

    async fn seeded_ctx(outputs: Vec<WorkerOutput>) -> (ExecutionContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let run_id = RunId::new();
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path(), &session_id, &run_id));
        let ctx = ExecutionContext::new(session_id, run_id, store);
        let meta = StageMetadata::new(3, ctx.session_id.clone(), ctx.run_id.clone(), None, None).unwrap();
        ctx.store.write(&StageId::for_stage_number(3).unwrap(), &Checkpoint::new(meta, outputs)).await.unwrap();
        (ctx, dir)
    }

    #[tokio::test]
    async fn web_candidate_with_one_source_is_provisional() {
        let output = WorkerOutput::ok("web-0", vec![raw("Nishiki Market", Some("https://a"))], std::time::Duration::from_millis(10));
        let (ctx, _dir) = seeded_ctx(vec![output]).await;
        let stage = NormalizeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<NormalizeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data.candidates.len(), 1);
        assert_eq!(checkpoint.data.candidates[0].confidence, Confidence::Provisional);
    }

    #[tokio::test]
    async fn error_worker_contributes_no_candidates_but_is_logged() {
        let output = WorkerOutput::error("places-0", "upstream exploded", std::time::Duration::from_millis(5));
        let (ctx, _dir) = seeded_ctx(vec![output]).await;
        let stage = NormalizeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<NormalizeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert!(checkpoint.data.candidates.is_empty());
        assert_eq!(checkpoint.data.stats.errors, vec!["places-0: upstream exploded".to_string()]);
    }

    #[tokio::test]
    async fn empty_title_is_dropped() {
        let output = WorkerOutput::ok("web-0", vec![raw("   ", Some("https://a"))], std::time::Duration::from_millis(1));
        let (ctx, _dir) = seeded_ctx(vec![output]).await;
        let stage = NormalizeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<NormalizeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert!(checkpoint.data.candidates.is_empty());
    }

    #[tokio::test]
    async fn colliding_ids_get_unique_suffixes() {
        let output = WorkerOutput::ok(
            "web-0",
            vec![raw("Nishiki Market", Some("https://a")), raw("Nishiki Market", Some("https://b"))],
            std::time::Duration::from_millis(1),
        );
        let (ctx, _dir) = seeded_ctx(vec![output]).await;
        let stage = NormalizeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<NormalizeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        let ids: Vec<&str> = checkpoint.data.candidates.iter().map(|c| c.candidate_id.as_str()).collect();
        assert_ne!(ids[0], ids[1]);
        assert!(ids[1].ends_with("-1"));
    }
}
