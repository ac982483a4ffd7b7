// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 2 - Router Plan
//!
//! Turns an `EnrichedIntent` into a `WorkerPlan`: one assignment per
//! provider (web, places, and youtube unless `flags.skipYoutube`), each
//! with a query list built from destinations crossed with interests
//! (falling back to the destination alone when there are no interests).

use crate::config::RunConfig;
use async_trait::async_trait;
use wayfarer_pipeline_domain::entities::{Checkpoint, EnrichedIntent, RunManifest, StageMetadata, WorkerAssignment, WorkerPlan};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

/// Providers that always participate, in a fixed order so worker ids are
/// deterministic across runs of the same intent.
const CORE_PROVIDERS: &[&str] = &["web", "places"];
const YOUTUBE_PROVIDER: &str = "youtube";

pub struct RouterPlanStage {
    run_config: RunConfig,
}

impl RouterPlanStage {
    pub fn new(run_config: RunConfig) -> Self {
        Self { run_config }
    }

    fn queries_for(intent: &EnrichedIntent) -> Vec<String> {
        if intent.destinations.is_empty() {
            return vec![intent.title.clone()];
        }
        let interests: Vec<&String> = intent.interests.iter().chain(intent.inferred_tags.iter()).collect();
        if interests.is_empty() {
            return intent.destinations.clone();
        }
        let mut queries = Vec::with_capacity(intent.destinations.len() * interests.len());
        for destination in &intent.destinations {
            for interest in &interests {
                queries.push(format!("{interest} in {destination}"));
            }
        }
        queries
    }

    fn providers(&self) -> Vec<&'static str> {
        let mut providers = CORE_PROVIDERS.to_vec();
        if !self.run_config.flags.skip_youtube {
            providers.push(YOUTUBE_PROVIDER);
        }
        providers
    }
}

#[async_trait]
impl Stage for RouterPlanStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(2).expect("stage 2 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![1]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<EnrichedIntent> = ctx.store.read(&StageId::for_stage_number(1)?).await?;
        let queries = Self::queries_for(&upstream.data);

        let assignments = self
            .providers()
            .into_iter()
            .enumerate()
            .map(|(index, provider)| WorkerAssignment {
                worker_id: format!("{provider}-{index}"),
                provider: provider.to_string(),
                queries: queries.clone(),
                max_results: self.run_config.limits.max_candidates_per_worker,
                timeout_ms: self.run_config.limits.worker_timeout_ms,
            })
            .collect();

        let plan = WorkerPlan { assignments };
        let meta = StageMetadata::new(2, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(1)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, plan)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({ "assignments": [] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::checkpoint::FileCheckpointStore;
    use std::sync::Arc;
    use wayfarer_pipeline_domain::repositories::CheckpointStore;
    use wayfarer_pipeline_domain::value_objects::{RunId, SessionId};

    async fn seeded_ctx(run_config: &RunConfig) -> (ExecutionContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let run_id = RunId::new();
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path(), &session_id, &run_id));
        let ctx = ExecutionContext::new(session_id, run_id, store);

        let intent = EnrichedIntent {
            session_id: ctx.session_id.clone(),
            title: "Kyoto Trip".into(),
            destinations: vec!["Kyoto".into()],
            date_range: wayfarer_pipeline_domain::entities::DateRange {
                start: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
                end: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            },
            flexibility: wayfarer_pipeline_domain::entities::Flexibility {
                flexibility_type: wayfarer_pipeline_domain::entities::FlexibilityType::Fixed,
                days: None,
            },
            interests: vec!["food".into()],
            constraints: Default::default(),
            attachments: vec![],
            created_at: chrono::Utc::now(),
            inferred_tags: vec!["culinary".into()],
        };
        let meta = StageMetadata::new(1, ctx.session_id.clone(), ctx.run_id.clone(), None, None).unwrap();
        ctx.store.write(&StageId::for_stage_number(1).unwrap(), &Checkpoint::new(meta, intent)).await.unwrap();
        let _ = run_config;
        (ctx, dir)
    }

    #[tokio::test]
    async fn builds_one_assignment_per_provider_including_youtube() {
        let run_config = RunConfig::default();
        let (ctx, _dir) = seeded_ctx(&run_config).await;
        let stage = RouterPlanStage::new(run_config);
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<WorkerPlan> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data.assignments.len(), 3);
        assert!(checkpoint.data.assignments.iter().any(|a| a.provider == "youtube"));
        assert!(checkpoint.data.assignments[0].queries.iter().any(|q| q.contains("Kyoto")));
    }

    #[tokio::test]
    async fn skip_youtube_flag_omits_the_youtube_provider() {
        let mut run_config = RunConfig::default();
        run_config.flags.skip_youtube = true;
        let (ctx, _dir) = seeded_ctx(&run_config).await;
        let stage = RouterPlanStage::new(run_config);
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<WorkerPlan> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data.assignments.len(), 2);
        assert!(checkpoint.data.assignments.iter().all(|a| a.provider != "youtube"));
    }
}
