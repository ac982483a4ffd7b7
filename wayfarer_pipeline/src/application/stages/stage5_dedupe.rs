// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 5 - Dedupe/Cluster
//!
//! Two-phase clustering (spec.md §4.6): exact bucketing by place id or a
//! content hash, then a single-pass agglomerative similarity merge over
//! group representatives. Each surviving group becomes one `Candidate`
//! carrying its representative's fields plus merged `sourceRefs`/`tags`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use wayfarer_pipeline_domain::entities::{Candidate, Checkpoint, RunManifest, StageMetadata};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::{city, normalize_text, ClusterId, StageId};

use super::stage4_normalize::NormalizeOutput;

const SIMILARITY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupeStats {
    pub original_count: usize,
    pub cluster_count: usize,
    pub deduped_count: usize,
    pub duplicates_removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeOutput {
    pub candidates: Vec<Candidate>,
    pub stats: DedupeStats,
}

pub struct DedupeStage;

impl Default for DedupeStage {
    fn default() -> Self {
        Self
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    normalize_text(text).split_whitespace().map(String::from).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn location_similarity(a: &Candidate, b: &Candidate) -> f64 {
    match (a.coordinates, b.coordinates) {
        (Some(ca), Some(cb)) => {
            let meters = ca.distance_meters(&cb);
            if meters < 50.0 {
                1.0
            } else if meters < 200.0 {
                0.8
            } else if meters < 500.0 {
                0.5
            } else {
                0.0
            }
        }
        _ => jaccard(&tokenize(a.location_text.as_deref().unwrap_or("")), &tokenize(b.location_text.as_deref().unwrap_or(""))),
    }
}

fn candidate_similarity(a: &Candidate, b: &Candidate) -> f64 {
    0.6 * jaccard(&tokenize(&a.title), &tokenize(&b.title)) + 0.4 * location_similarity(a, b)
}

fn exact_bucket_key(candidate: &Candidate) -> String {
    if let Some(place_id) = &candidate.metadata.place_id {
        return format!("place:{place_id}");
    }
    let payload = format!("|{}|{}", normalize_text(&candidate.title), city(candidate.location_text.as_deref().unwrap_or("")));
    let digest = Sha256::digest(payload.as_bytes());
    format!("hash:{}", &hex::encode(digest)[..16])
}

impl DedupeStage {
    /// Phase 1: group candidates by exact bucket key, preserving the order
    /// in which each key first appears.
    fn bucket(candidates: Vec<Candidate>) -> Vec<Vec<Candidate>> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: std::collections::HashMap<String, Vec<Candidate>> = std::collections::HashMap::new();
        for candidate in candidates {
            let key = exact_bucket_key(&candidate);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(candidate);
        }
        order.into_iter().map(|key| groups.remove(&key).unwrap()).collect()
    }

    /// Highest `score` wins; ties keep the earliest-seen member (input order).
    fn representative_index(group: &[Candidate]) -> usize {
        let mut best = 0usize;
        for (index, candidate) in group.iter().enumerate().skip(1) {
            if candidate.score > group[best].score {
                best = index;
            }
        }
        best
    }

    /// Phase 2: single-pass agglomerative merge of group representatives.
    fn merge_similar_groups(mut groups: Vec<Vec<Candidate>>) -> Vec<Vec<Candidate>> {
        let mut absorbed = vec![false; groups.len()];
        for i in 0..groups.len() {
            if absorbed[i] {
                continue;
            }
            let rep_i = groups[i][Self::representative_index(&groups[i])].clone();
            for j in (i + 1)..groups.len() {
                if absorbed[j] {
                    continue;
                }
                let rep_j = groups[j][Self::representative_index(&groups[j])].clone();
                if candidate_similarity(&rep_i, &rep_j) >= SIMILARITY_THRESHOLD {
                    let members = std::mem::take(&mut groups[j]);
                    groups[i].extend(members);
                    absorbed[j] = true;
                }
            }
        }
        groups
            .into_iter()
            .zip(absorbed)
            .filter(|(_, was_absorbed)| !was_absorbed)
            .map(|(group, _)| group)
            .collect()
    }

    fn build_cluster_candidate(mut group: Vec<Candidate>, index: usize) -> Candidate {
        let rep_index = Self::representative_index(&group);
        let representative = group.remove(rep_index);
        let remaining = group;

        let mut represented_origins: HashSet<wayfarer_pipeline_domain::entities::Origin> = HashSet::new();
        represented_origins.insert(representative.origin);

        let mut by_score_desc = remaining.clone();
        by_score_desc.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut alternates: Vec<Candidate> = Vec::new();
        for candidate in &by_score_desc {
            if alternates.len() >= 3 {
                break;
            }
            if !represented_origins.contains(&candidate.origin) {
                represented_origins.insert(candidate.origin);
                alternates.push(candidate.clone());
            }
        }
        if alternates.len() < 3 {
            for candidate in &by_score_desc {
                if alternates.len() >= 3 {
                    break;
                }
                if !alternates.iter().any(|a| a.candidate_id == candidate.candidate_id) {
                    alternates.push(candidate.clone());
                }
            }
        }

        let mut merged_source_refs = representative.source_refs.clone();
        for alt in &alternates {
            merged_source_refs.extend(alt.source_refs.clone());
        }
        let mut seen_urls = HashSet::new();
        merged_source_refs.retain(|r| seen_urls.insert(r.url.clone()));

        let mut merged_tags: HashSet<String> = representative.tags.iter().map(|t| t.to_lowercase()).collect();
        for alt in &alternates {
            merged_tags.extend(alt.tags.iter().map(|t| t.to_lowercase()));
        }
        let mut tags: Vec<String> = merged_tags.into_iter().collect();
        tags.sort();

        let mut merged = representative;
        merged.source_refs = merged_source_refs;
        merged.tags = tags;
        merged.cluster_id = Some(ClusterId::for_index(index));
        merged
    }
}

#[async_trait]
impl Stage for DedupeStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(5).expect("stage 5 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![4]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<NormalizeOutput> = ctx.store.read(&StageId::for_stage_number(4)?).await?;
        let original_count = upstream.data.candidates.len();

        let candidates: Vec<Candidate> = crate::infrastructure::rayon_pool::run_cpu_bound(move || {
            let buckets = Self::bucket(upstream.data.candidates);
            let clusters = Self::merge_similar_groups(buckets);
            clusters
                .into_iter()
                .enumerate()
                .map(|(index, group)| Self::build_cluster_candidate(group, index))
                .collect()
        });
        let cluster_count = candidates.len();

        let stats = DedupeStats {
            original_count,
            cluster_count,
            deduped_count: candidates.len(),
            duplicates_removed: original_count.saturating_sub(cluster_count),
        };

        let output = DedupeOutput { candidates, stats };
        let meta = StageMetadata::new(5, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(4)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, output)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({ "candidates": [], "stats": DedupeStats::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::checkpoint::FileCheckpointStore;
    use std::sync::Arc;
    use wayfarer_pipeline_domain::entities::{CandidateMetadata, CandidateType, Confidence, Coordinates, Origin};
    use wayfarer_pipeline_domain::repositories::CheckpointStore;
    use wayfarer_pipeline_domain::value_objects::{CandidateId, RunId, SessionId};

    fn candidate(id: &str, title: &str, location: &str, coordinates: Option<Coordinates>, score: f64, origin: Origin) -> Candidate {
        Candidate {
            candidate_id: CandidateId::from_string(id),
            candidate_type: CandidateType::Place,
            title: title.into(),
            summary: "summary".into(),
            location_text: Some(location.into()),
            coordinates,
            tags: vec!["food".into()],
            origin,
            source_refs: vec![],
            confidence: Confidence::Provisional,
            validation: None,
            score,
            cluster_id: None,
            metadata: CandidateMetadata::default(),
        }
    }

    async fn seeded_ctx(candidates: Vec<Candidate>) -> (ExecutionContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let run_id = RunId::new();
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path(), &session_id, &run_id));
        let ctx = ExecutionContext::new(session_id, run_id, store);
        let meta = StageMetadata::new(4, ctx.session_id.clone(), ctx.run_id.clone(), None, None).unwrap();
        let data = NormalizeOutput {
            candidates,
            stats: super::super::stage4_normalize::NormalizeStats::default(),
        };
        ctx.store.write(&StageId::for_stage_number(4).unwrap(), &Checkpoint::new(meta, data)).await.unwrap();
        (ctx, dir)
    }

    #[tokio::test]
    async fn exact_duplicate_titles_and_locations_merge_into_one() {
        let a = candidate("web-aaaaaaaa", "Nishiki Market", "Kyoto", None, 80.0, Origin::Web);
        let b = candidate("places-bbbbbbbb", "Nishiki Market", "Kyoto", None, 60.0, Origin::Places);
        let (ctx, _dir) = seeded_ctx(vec![a, b]).await;
        let stage = DedupeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<DedupeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data.candidates.len(), 1);
        assert_eq!(checkpoint.data.stats.duplicates_removed, 1);
        assert_eq!(checkpoint.data.candidates[0].title, "Nishiki Market");
        assert_eq!(checkpoint.data.candidates[0].candidate_id.as_str(), "web-aaaaaaaa");
    }

    #[tokio::test]
    async fn near_duplicate_titles_at_the_same_spot_merge_via_fuzzy_match() {
        // "Kiyomizu Temple Viewpoint" / "Kiyomizu Temple Main Viewpoint": titles
        // differ (different normalized titles, different exact bucket keys) but
        // share 3 of 4 title tokens (jaccard 0.75) and sit at the same
        // coordinates (location similarity 1.0), so candidate_similarity lands
        // at exactly 0.6*0.75 + 0.4*1.0 = 0.85 - right at SIMILARITY_THRESHOLD,
        // only reachable through merge_similar_groups, not the exact bucket.
        let spot = Coordinates { lat: 34.9948, lng: 135.785 };
        let a = candidate("web-aaaaaaaa", "Kiyomizu Temple Viewpoint", "Kyoto", Some(spot), 70.0, Origin::Web);
        let b = candidate("places-bbbbbbbb", "Kiyomizu Temple Main Viewpoint", "Kyoto", Some(spot), 85.0, Origin::Places);
        let (ctx, _dir) = seeded_ctx(vec![a, b]).await;
        let stage = DedupeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<DedupeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data.candidates.len(), 1);
        assert_eq!(checkpoint.data.stats.duplicates_removed, 1);
        assert_eq!(checkpoint.data.candidates[0].title, "Kiyomizu Temple Main Viewpoint");
    }

    #[tokio::test]
    async fn distant_same_name_candidates_stay_separate() {
        let a = candidate(
            "web-aaaaaaaa",
            "Central Park Cafe",
            "New York",
            Some(Coordinates { lat: 40.785, lng: -73.968 }),
            70.0,
            Origin::Web,
        );
        let b = candidate(
            "web-bbbbbbbb",
            "Central Park Cafe",
            "Kyoto",
            Some(Coordinates { lat: 35.011, lng: 135.768 }),
            65.0,
            Origin::Web,
        );
        let (ctx, _dir) = seeded_ctx(vec![a, b]).await;
        let stage = DedupeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<DedupeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data.candidates.len(), 2);
    }

    #[tokio::test]
    async fn every_surviving_candidate_has_a_cluster_id() {
        let a = candidate("web-aaaaaaaa", "Arashiyama Bamboo Grove", "Kyoto", None, 90.0, Origin::Web);
        let (ctx, _dir) = seeded_ctx(vec![a]).await;
        let stage = DedupeStage;
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<DedupeOutput> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert!(checkpoint.data.candidates[0].cluster_id.is_some());
        assert_eq!(checkpoint.data.candidates[0].cluster_id.as_ref().unwrap().as_str(), "cluster_0000");
    }
}
