// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage 3 - Worker Pool
//!
//! The parallel fan-out at the center of the pipeline (spec.md §4.4): runs
//! every `WorkerAssignment` from the stage-2 plan concurrently, bounded by
//! a [`ConcurrencyLimiter`], gated per-provider by a [`CircuitBreaker`],
//! with in-worker retry on retryable failures. Every assignment produces
//! exactly one `WorkerOutput` - the pool itself never propagates a
//! worker's error out of `run`. Each worker's raw output is also persisted
//! as a side artifact under `worker_outputs/<workerId>.json` so a failed
//! run can be inspected without waiting for stage 4 to run.

use crate::infrastructure::concurrency::{CircuitBreaker, CircuitBreakerConfig, ConcurrencyLimiter, RetryPolicy, RetryableKind};
use crate::infrastructure::providers::ProviderClient;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wayfarer_pipeline_domain::entities::{Checkpoint, RawCandidate, RunManifest, StageMetadata, WorkerAssignment, WorkerOutput, WorkerPlan};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStoreExt;
use wayfarer_pipeline_domain::services::{ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::StageId;

pub struct WorkerPoolStage {
    providers: HashMap<String, Arc<dyn ProviderClient>>,
    limiter: ConcurrencyLimiter,
    breaker: Arc<CircuitBreaker>,
    retry_policy: RetryPolicy,
}

impl WorkerPoolStage {
    pub fn new(providers: HashMap<String, Arc<dyn ProviderClient>>, concurrency: usize) -> Self {
        Self {
            providers,
            limiter: ConcurrencyLimiter::new(concurrency),
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
            retry_policy: RetryPolicy::standard(),
        }
    }

    async fn fetch_with_retry(client: &dyn ProviderClient, query: &str, max_results: usize, policy: &RetryPolicy) -> Result<Vec<RawCandidate>, PipelineError> {
        let mut attempt = 0;
        loop {
            match client.search(query, max_results).await {
                Ok(result) => {
                    if result.rate_limited && policy.should_retry(attempt, &RetryableKind::RateLimited) {
                        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(result.candidates);
                }
                Err(err) => {
                    let kind = RetryableKind::from_message(&err.to_string());
                    if policy.should_retry(attempt, &kind) {
                        tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Dedupes candidates returned across a worker's own query fan-out by
    /// the most stable identifier available: the provider's own place id
    /// when present, falling back to normalized title + location text
    /// (spec.md §4.4: "a Places worker dedupes by place-id across its own
    /// query fan-out").
    fn dedupe_within_worker(candidates: Vec<RawCandidate>) -> Vec<RawCandidate> {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| {
                let key = c
                    .metadata
                    .get("place_id")
                    .and_then(|v| v.as_str())
                    .map(|id| format!("id:{id}"))
                    .unwrap_or_else(|| format!("{}|{}", c.title.to_lowercase(), c.location_text.clone().unwrap_or_default().to_lowercase()));
                seen.insert(key)
            })
            .collect()
    }

    async fn run_worker(&self, assignment: &WorkerAssignment) -> WorkerOutput {
        let start = Instant::now();
        if self.breaker.is_open(&assignment.provider) {
            return WorkerOutput::skipped(assignment.worker_id.clone(), "circuit breaker open");
        }

        let Some(client) = self.providers.get(&assignment.provider).cloned() else {
            return WorkerOutput::error(assignment.worker_id.clone(), format!("no provider client registered for {}", assignment.provider), start.elapsed());
        };

        let timeout = Duration::from_millis(assignment.timeout_ms);
        let queries = assignment.queries.clone();
        let max_results = assignment.max_results;
        let policy = self.retry_policy;
        let fetch_all = async move {
            let mut all = Vec::new();
            for query in &queries {
                let candidates = Self::fetch_with_retry(client.as_ref(), query, max_results, &policy).await?;
                all.extend(candidates);
            }
            Ok::<Vec<RawCandidate>, PipelineError>(all)
        };

        match tokio::time::timeout(timeout, fetch_all).await {
            Ok(Ok(candidates)) => {
                self.breaker.record_success(&assignment.provider);
                let mut deduped = Self::dedupe_within_worker(candidates);
                deduped.truncate(assignment.max_results);
                WorkerOutput::ok(assignment.worker_id.clone(), deduped, start.elapsed())
            }
            Ok(Err(err)) => {
                self.breaker.record_failure(&assignment.provider);
                WorkerOutput::error(assignment.worker_id.clone(), err.to_string(), start.elapsed())
            }
            Err(_) => {
                self.breaker.record_failure(&assignment.provider);
                WorkerOutput::error(assignment.worker_id.clone(), format!("timed out after {}ms", assignment.timeout_ms), start.elapsed())
            }
        }
    }
}

#[async_trait]
impl Stage for WorkerPoolStage {
    fn stage_id(&self) -> StageId {
        StageId::for_stage_number(3).expect("stage 3 is always valid")
    }

    fn depends_on(&self) -> Vec<u8> {
        vec![2]
    }

    async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
        let upstream: Checkpoint<WorkerPlan> = ctx.store.read(&StageId::for_stage_number(2)?).await?;

        let outputs_future = upstream.data.assignments.iter().map(|assignment| async move {
            let output = self.limiter.run(self.run_worker(assignment)).await.unwrap_or_else(|e| {
                WorkerOutput::error(assignment.worker_id.clone(), e.to_string(), Duration::from_millis(0))
            });
            output
        });
        let outputs: Vec<WorkerOutput> = futures::future::join_all(outputs_future).await;

        for output in &outputs {
            let bytes = serde_json::to_vec_pretty(output)?;
            ctx.store.write_side_artifact(&format!("worker_outputs/{}.json", output.worker_id), &bytes).await?;
        }

        let meta = StageMetadata::new(3, ctx.session_id.clone(), ctx.run_id.clone(), Some(StageId::for_stage_number(2)?), None)?;
        ctx.store.write(&self.stage_id(), &Checkpoint::new(meta, outputs)).await
    }

    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!([])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::checkpoint::FileCheckpointStore;
    use crate::infrastructure::providers::FakeProviderClient;
    use wayfarer_pipeline_domain::repositories::CheckpointStore;
    use wayfarer_pipeline_domain::value_objects::{RunId, SessionId};

    fn candidate(title: &str) -> RawCandidate {
        RawCandidate {
            title: title.into(),
            summary: "summary".into(),
            location_text: Some("Kyoto".into()),
            lat: None,
            lng: None,
            tags: vec![],
            source_url: None,
            publisher: None,
            snippet: None,
            metadata: Default::default(),
        }
    }

    async fn seeded_ctx(plan: WorkerPlan) -> (ExecutionContext, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let run_id = RunId::new();
        let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path(), &session_id, &run_id));
        let ctx = ExecutionContext::new(session_id, run_id, store);
        let meta = StageMetadata::new(2, ctx.session_id.clone(), ctx.run_id.clone(), None, None).unwrap();
        ctx.store.write(&StageId::for_stage_number(2).unwrap(), &Checkpoint::new(meta, plan)).await.unwrap();
        (ctx, dir)
    }

    #[tokio::test]
    async fn successful_worker_produces_ok_output_and_side_artifact() {
        let assignment = WorkerAssignment {
            worker_id: "web-0".into(),
            provider: "web".into(),
            queries: vec!["food in kyoto".into()],
            max_results: 10,
            timeout_ms: 5_000,
        };
        let (ctx, _dir) = seeded_ctx(WorkerPlan { assignments: vec![assignment] }).await;

        let mut providers: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
        providers.insert(
            "web".into(),
            Arc::new(FakeProviderClient::new("web").with_fixture("food in kyoto", vec![candidate("Nishiki Market")])),
        );
        let stage = WorkerPoolStage::new(providers, 3);
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<Vec<WorkerOutput>> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data.len(), 1);
        assert_eq!(checkpoint.data[0].candidates.len(), 1);
        assert!(matches!(checkpoint.data[0].status, wayfarer_pipeline_domain::entities::WorkerStatus::Ok));
    }

    #[tokio::test]
    async fn unregistered_provider_yields_error_status_without_aborting_run() {
        let assignment = WorkerAssignment {
            worker_id: "places-0".into(),
            provider: "places".into(),
            queries: vec!["temples".into()],
            max_results: 10,
            timeout_ms: 5_000,
        };
        let (ctx, _dir) = seeded_ctx(WorkerPlan { assignments: vec![assignment] }).await;

        let stage = WorkerPoolStage::new(HashMap::new(), 3);
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<Vec<WorkerOutput>> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert!(matches!(checkpoint.data[0].status, wayfarer_pipeline_domain::entities::WorkerStatus::Error));
    }

    #[tokio::test]
    async fn dedupes_by_place_id_across_queries() {
        let mut with_id = candidate("Nishiki Market");
        with_id.metadata.insert("place_id".into(), serde_json::json!("place-1"));
        let mut same_id_again = candidate("Nishiki Market (alt listing)");
        same_id_again.metadata.insert("place_id".into(), serde_json::json!("place-1"));

        let assignment = WorkerAssignment {
            worker_id: "places-0".into(),
            provider: "places".into(),
            queries: vec!["food".into(), "market".into()],
            max_results: 10,
            timeout_ms: 5_000,
        };
        let (ctx, _dir) = seeded_ctx(WorkerPlan { assignments: vec![assignment] }).await;

        let mut providers: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
        providers.insert(
            "places".into(),
            Arc::new(
                FakeProviderClient::new("places")
                    .with_fixture("food", vec![with_id])
                    .with_fixture("market", vec![same_id_again]),
            ),
        );
        let stage = WorkerPoolStage::new(providers, 3);
        let manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        stage.run(&ctx, &manifest).await.unwrap();

        let checkpoint: Checkpoint<Vec<WorkerOutput>> = ctx.store.read(&stage.stage_id()).await.unwrap();
        assert_eq!(checkpoint.data[0].candidates.len(), 1);
    }
}
