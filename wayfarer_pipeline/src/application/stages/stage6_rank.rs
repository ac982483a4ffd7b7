// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 6 - Rank
//!
//! Weighted multi-factor scoring (spec.md §4.7): relevance, credibility,
//! recency, and a diversity term that is both a per-candidate penalty and
//! a hard post-pass cap. Two passes over the candidate list are required
//! because diversity depends on the emission order the first pass itself
//! establishes.

use super::keywords::keywords_for_type;
use super::stage5_dedupe::DedupeOutput;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use wayfarer_pipeline_domain::entities::{Candidate, CandidateType, Checkpoint, Confidence, EnrichedIntent, Origin, RunManifest, StageMetadata, ValidationStatus};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::{normalize_text, StageId};

const DIVERSITY_CAP: usize = 4;
const DIVERSITY_CAP_WINDOW: usize = 20;

pub struct RankStage;

impl Default for RankStage {
    fn default() -> Self {
        Self
    }
}

fn relevance(candidate: &Candidate, intent: &EnrichedIntent) -> f64 {
    let haystack = normalize_text(&format!(
        "{} {} {}",
        candidate.location_text.clone().unwrap_or_default(),
        candidate.title,
        candidate.summary
    ));
    let destination_score = if intent.destinations.iter().any(|d| haystack.contains(&normalize_text(d))) { 30.0 } else { 0.0 };

    let tags: std::collections::HashSet<String> = candidate.tags.iter().map(|t| t.to_lowercase()).collect();
    let interests = intent.interest_terms();
    let overlap = tags.intersection(&interests).count();
    let interest_score = if overlap == 0 {
        0.0
    } else {
        (40.0 * overlap as f64 / tags.len().min(interests.len()).max(1) as f64).min(40.0)
    };

    let keywords = keywords_for_type(candidate.candidate_type);
    let mut type_bonus = 0.0;
    for interest in &interests {
        if keywords.iter().any(|kw| interest.contains(kw) || kw.contains(interest.as_str())) {
            type_bonus += 10.0;
        }
    }
    type_bonus = type_bonus.min(30.0);

    destination_score + interest_score + type_bonus
}

fn credibility(candidate: &Candidate) -> f64 {
    let base = match candidate.origin {
        Origin::Places => 90.0,
        Origin::Web => match candidate.source_refs.len() {
            0 => 40.0,
            1 => 60.0,
            _ => 80.0,
        },
        Origin::Youtube => {
            if matches!(candidate.confidence, Confidence::Verified | Confidence::High) {
                50.0
            } else {
                30.0
            }
        }
    };
    let boost = match candidate.validation.as_ref().map(|v| v.status) {
        Some(ValidationStatus::Verified) => 35.0,
        Some(ValidationStatus::PartiallyVerified) => 15.0,
        _ => 0.0,
    };
    (base + boost).clamp(0.0, 100.0)
}

fn recency(candidate: &Candidate, now: chrono::DateTime<chrono::Utc>) -> f64 {
    match candidate.metadata.published_at {
        None => 50.0,
        Some(published_at) => {
            let days = (now - published_at).num_days();
            if days < 0 {
                100.0
            } else if days <= 30 {
                100.0
            } else if days <= 90 {
                80.0
            } else if days <= 180 {
                60.0
            } else if days <= 365 {
                40.0
            } else {
                20.0
            }
        }
    }
}

fn diversity(candidate_type: CandidateType, predecessor_counts: &HashMap<CandidateType, usize>) -> f64 {
    let count = predecessor_counts.get(&candidate_type).copied().unwrap_or(0);
    (100.0 - 10.0 * count as f64).max(0.0)
}

fn score(candidate: &Candidate, intent: &EnrichedIntent, predecessor_counts: &HashMap<CandidateType, usize>, now: chrono::DateTime<chrono::Utc>) -> f64 {
    let r = relevance(candidate, intent);
    let c = credibility(candidate);
    let rec = recency(candidate, now);
    let d = diversity(candidate.candidate_type, predecessor_counts);
    (0.35 * r + 0.30 * c + 0.20 * rec + 0.15 * d).round().clamp(0.0, 100.0)
}

fn sort_by_score_then_id(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| match b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.candidate_id.as_str().cmp(b.candidate_id.as_str()),
        other => other,
    });
}

/// First-fit cap enforcement: while any type exceeds `DIVERSITY_CAP`
/// within the top `DIVERSITY_CAP_WINDOW`, swap the lowest-scoring
/// over-represented member with the earliest candidate beyond the window
/// of a different type.
fn enforce_diversity_cap(candidates: &mut [Candidate]) {
    let window = DIVERSITY_CAP_WINDOW.min(candidates.len());
    loop {
        let mut counts: HashMap<CandidateType, usize> = HashMap::new();
        for candidate in &candidates[..window] {
            *counts.entry(candidate.candidate_type).or_insert(0) += 1;
        }
        // Deterministic selection: sort the offending types by their
        // discriminant rather than relying on `HashMap` iteration order,
        // which Rust randomizes per process and would otherwise make the
        // swap order (and so the final window composition) vary run to
        // run for byte-identical input.
        let mut over_types: Vec<CandidateType> = counts.iter().filter(|(_, &count)| count > DIVERSITY_CAP).map(|(t, _)| *t).collect();
        over_types.sort_by_key(|t| *t as u8);
        let Some(over_type) = over_types.into_iter().next() else {
            break;
        };
        let remove_index = (0..window).rev().find(|&i| candidates[i].candidate_type == over_type);
        let swap_index = (window..candidates.len()).find(|&i| candidates[i].candidate_type != over_type);
        match (remove_index, swap_index) {
            (Some(r), Some(s)) => candidates.swap(r, s),
            _ => break,
        }
    }
}

#[async_trait]
impl Stage for RankStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(6).expect("stage 6 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![1, 5]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let intent: Checkpoint<EnrichedIntent> = ctx.store.read(&StageId::for_stage_number(1)?).await?;
        let upstream: Checkpoint<DedupeOutput> = ctx.store.read(&StageId::for_stage_number(5)?).await?;
        let now = chrono::Utc::now();
        let intent_data = intent.data;

        let candidates = crate::infrastructure::rayon_pool::run_cpu_bound(move || {
            let mut candidates = upstream.data.candidates;

            let empty_counts = HashMap::new();
            for candidate in &mut candidates {
                candidate.score = score(candidate, &intent_data, &empty_counts, now);
            }
            sort_by_score_then_id(&mut candidates);

            let mut running_counts: HashMap<CandidateType, usize> = HashMap::new();
            for candidate in &mut candidates {
                candidate.score = score(candidate, &intent_data, &running_counts, now);
                *running_counts.entry(candidate.candidate_type).or_insert(0) += 1;
            }
            sort_by_score_then_id(&mut candidates);

            enforce_diversity_cap(&mut candidates);
            candidates
        });

        let meta = StageMetadata::new(6, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(5)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, candidates)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!([])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::checkpoint::FileCheckpointStore;
    use std::sync::Arc;
    use wayfarer_pipeline_domain::entities::{CandidateMetadata, Coordinates, DateRange, Flexibility, FlexibilityType};
    use wayfarer_pipeline_domain::repositories::CheckpointStore;
    use wayfarer_pipeline_domain::value_objects::{CandidateId, RunId, SessionId};

    fn candidate(id: &str, title: &str, candidate_type: CandidateType, origin: Origin, tags: Vec<&str>) -> Candidate {
        Candidate {
            candidate_id: CandidateId::from_string(id),
            candidate_type,
            title: title.into(),
            summary: "summary".into(),
            location_text: Some("Kyoto".into()),
            coordinates: None::<Coordinates>,
            tags: tags.into_iter().map(String::from).collect(),
            origin,
            source_refs: vec![],
            confidence: Confidence::Provisional,
            validation: None,
            score: 0.0,
            cluster_id: None,
            metadata: CandidateMetadata::default(),
        }
    }

    fn intent() -> EnrichedIntent {
        EnrichedIntent {
            session_id: SessionId::from_string("2026-07-27-kyoto").unwrap(),
            title: "Kyoto Trip".into(),
            destinations: vec!["Kyoto".into()],
            date_range: DateRange {
                start: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
                end: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            },
            flexibility: Flexibility { flexibility_type: FlexibilityType::Fixed, days: None },
            interests: vec!["food".into()],
            constraints: Default::default(),
            attachments: vec![],
            created_at: chrono::Utc::now(),
            inferred_tags: vec!["culinary".into()],
        }
    }

    async fn seeded_ctx(candidates: Vec<Candidate>) -> (ExecutionContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let run_id = RunId::new();
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path(), &session_id, &run_id));
        let ctx = ExecutionContext::new(session_id, run_id, store);

        let intent_meta = StageMetadata::new(1, ctx.session_id.clone(), ctx.run_id.clone(), None, None).unwrap();
        ctx.store
            .write(&StageId::for_stage_number(1).unwrap(), &Checkpoint::new(intent_meta, intent()))
            .await
            .unwrap();

        let dedupe_meta = StageMetadata::new(5, ctx.session_id.clone(), ctx.run_id.clone(), None, None).unwrap();
        let data = DedupeOutput {
            candidates,
            stats: super::super::stage5_dedupe::DedupeStats::default(),
        };
        ctx.store.write(&StageId::for_stage_number(5).unwrap(), &Checkpoint::new(dedupe_meta, data)).await.unwrap();
        (ctx, dir)
    }

    #[tokio::test]
    async fn every_score_is_within_0_to_100() {
        let candidates = vec![
            candidate("web-aaaaaaaa", "Nishiki Market", CandidateType::Food, Origin::Web, vec!["food", "culinary"]),
            candidate("places-bbbbbbbb", "Fushimi Inari", CandidateType::Place, Origin::Places, vec![]),
        ];
        let (ctx, _dir) = seeded_ctx(candidates).await;
        let stage = RankStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<Vec<Candidate>> = ctx.store.read(&stage.stage_id()).await.unwrap();
        for candidate in &checkpoint.data {
            assert!((0.0..=100.0).contains(&candidate.score));
        }
    }

    #[tokio::test]
    async fn food_tagged_candidate_outranks_unrelated_candidate_for_food_interest() {
        let candidates = vec![
            candidate("places-bbbbbbbb", "Unrelated Shrine", CandidateType::Place, Origin::Places, vec![]),
            candidate("web-aaaaaaaa", "Nishiki Food Market", CandidateType::Food, Origin::Web, vec!["food", "culinary"]),
        ];
        let (ctx, _dir) = seeded_ctx(candidates).await;
        let stage = RankStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<Vec<Candidate>> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data[0].candidate_id.as_str(), "web-aaaaaaaa");
    }

    #[tokio::test]
    async fn diversity_cap_limits_same_type_in_top_20() {
        let mut candidates = Vec::new();
        for i in 0..15 {
            candidates.push(candidate(&format!("places-{i:08x}"), &format!("Place {i}"), CandidateType::Place, Origin::Places, vec![]));
        }
        for i in 0..10 {
            candidates.push(candidate(&format!("web-{i:08x}"), &format!("Food Spot {i}"), CandidateType::Food, Origin::Web, vec!["food", "culinary"]));
        }
        let (ctx, _dir) = seeded_ctx(candidates).await;
        let stage = RankStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<Vec<Candidate>> = ctx.store.read(&stage.stage_id()).await.unwrap();
        let top20_places = checkpoint.data[..20].iter().filter(|c| c.candidate_type == CandidateType::Place).count();
        assert!(top20_places <= 4);
    }
}
