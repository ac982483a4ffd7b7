// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Executor
//!
//! Drives the eleven stages in order, writing the run manifest as it
//! goes. The algorithm is spec.md §4.3's, including resume (`fromStage` +
//! `sourceRunId`), early stop (`stopAfterStage`), and degraded mode
//! (`continueOnError`).

use crate::application::stage_registry::create_resume_execution_plan;
use crate::infrastructure::checkpoint::sha256_hex;
use crate::infrastructure::observability::ObservabilityService;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use wayfarer_pipeline_domain::entities::RunManifest;
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::events::{NullObserver, ProcessingObserver, StageOutcome};
use wayfarer_pipeline_domain::repositories::CheckpointStore;
use wayfarer_pipeline_domain::services::{CostTracker, ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::{RunId, StageId};

/// A single stage failure recorded when `continueOnError` lets the run
/// continue past it (spec.md §7's `StageError`).
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage_id: StageId,
    pub category: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    pub from_stage: Option<u8>,
    pub source_run_id: Option<RunId>,
    pub stop_after_stage: Option<u8>,
    pub continue_on_error: bool,
}

pub struct PipelineResult {
    pub manifest: RunManifest,
    pub degraded_stages: Vec<StageError>,
    pub succeeded: bool,
    /// `true` once the run's cost tracker (shared with stage 9's
    /// narrative-generator calls) reports its configured budget met or
    /// exceeded. Flagging only - a run over budget still completes and
    /// writes its final checkpoint; nothing in spec.md §4.3's options
    /// asks for a hard abort on cost alone.
    pub over_budget: bool,
}

pub struct PipelineExecutor {
    observer: Arc<dyn ProcessingObserver>,
    observability: Arc<ObservabilityService>,
    cost_tracker: Option<Arc<Mutex<CostTracker>>>,
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self {
            observer: Arc::new(NullObserver),
            observability: Arc::new(ObservabilityService::new()),
            cost_tracker: None,
        }
    }
}

impl PipelineExecutor {
    pub fn new(observer: Arc<dyn ProcessingObserver>, observability: Arc<ObservabilityService>) -> Self {
        Self { observer, observability, cost_tracker: None }
    }

    /// Shares `tracker` with the executor so it can consult
    /// `CostTracker::is_over_budget()` once stage 9 (the only stage that
    /// records spend) has run. Pass the same `Arc` given to
    /// `AggregateStage::new` so both sides see the same ledger.
    pub fn with_cost_tracker(mut self, tracker: Arc<Mutex<CostTracker>>) -> Self {
        self.cost_tracker = Some(tracker);
        self
    }

    /// Runs `stages` (already filtered/ordered by the caller to match
    /// `options.from_stage`) against `ctx`, producing the final manifest.
    /// `stages` must be supplied in ascending stage-number order and must
    /// be exactly the stages that need to execute - the resume plan
    /// (copying skipped stages' checkpoints) is the caller's job via
    /// [`Self::prepare_resume`], kept separate so a caller that already has
    /// checkpoints in place (e.g. a from-scratch run) doesn't pay for it.
    pub async fn execute(
        &self,
        stages: Vec<Box<dyn Stage>>,
        ctx: &ExecutionContext,
        options: &ExecuteOptions,
    ) -> Result<PipelineResult, PipelineError> {
        if let Some(from_stage) = options.from_stage {
            if from_stage > 0 && options.source_run_id.is_none() {
                return Err(PipelineError::invalid_config("fromStage > 0 requires sourceRunId"));
            }
        }

        let mut manifest = RunManifest::new(ctx.run_id.clone(), ctx.session_id.clone());
        let mut degraded_stages = Vec::new();
        let mut over_budget = false;

        if options.dry_run {
            tracing::info!(stages = stages.len(), "dry run: skipping execution, plan only");
            return Ok(PipelineResult { manifest, degraded_stages, succeeded: true, over_budget });
        }

        for stage in stages {
            let stage_id = stage.stage_id();
            let stage_number = stage_id.stage_number();

            if ctx.is_cancelled() {
                manifest.record_failed(&stage_id, "run cancelled");
                return Ok(PipelineResult { manifest, degraded_stages, succeeded: false, over_budget });
            }

            manifest.record_started(&stage_id);
            self.observer.on_stage_started(&stage_id);
            let started = Instant::now();

            let outcome = stage.run(ctx, &manifest).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    let (checkpoint_path, input_hash) = self.finalize_checkpoint(ctx, &stage_id).await?;
                    manifest.record_completed(&stage_id, checkpoint_path, Some(input_hash));
                    self.observability.record_stage_run(&stage_id, duration_ms, 1, true);
                    self.observer.on_stage_finished(&stage_id, StageOutcome::Completed, duration_ms);
                    tracing::info!(stage = %stage_id, duration_ms, "stage completed");

                    if stage_number == 9 {
                        if let Some(tracker) = &self.cost_tracker {
                            if tracker.lock().is_over_budget() {
                                tracing::warn!(stage = %stage_id, "run exceeded its configured cost budget");
                                over_budget = true;
                            }
                        }
                    }
                }
                Err(err) => {
                    self.observability.record_stage_run(&stage_id, duration_ms, 0, false);
                    manifest.record_failed(&stage_id, err.to_string());

                    if options.continue_on_error {
                        tracing::warn!(stage = %stage_id, error = %err, "stage failed, continuing in degraded mode");
                        let degraded = wayfarer_pipeline_domain::entities::Checkpoint::new(
                            wayfarer_pipeline_domain::entities::StageMetadata::new(
                                stage_number,
                                ctx.session_id.clone(),
                                ctx.run_id.clone(),
                                if stage_number == 0 { None } else { StageId::for_stage_number(stage_number - 1).ok() },
                                None,
                            )?,
                            stage.degraded_checkpoint(),
                        );
                        ctx.store.write_raw(&stage_id, &degraded).await?;
                        let (checkpoint_path, input_hash) = self.finalize_checkpoint(ctx, &stage_id).await?;
                        manifest.record_completed(&stage_id, checkpoint_path, Some(input_hash));
                        degraded_stages.push(StageError { stage_id: stage_id.clone(), category: err.category(), message: err.to_string() });
                        self.observer.on_stage_finished(&stage_id, StageOutcome::Failed, duration_ms);
                        continue;
                    }

                    tracing::error!(stage = %stage_id, error = %err, "stage failed, aborting run");
                    self.observer.on_stage_finished(&stage_id, StageOutcome::Failed, duration_ms);
                    ctx.store.write_manifest(&manifest).await?;
                    self.observer.on_run_finished(false);
                    return Ok(PipelineResult { manifest, degraded_stages, succeeded: false, over_budget });
                }
            }

            if options.stop_after_stage == Some(stage_number) {
                tracing::info!(stage = %stage_id, "stopping after configured stage");
                break;
            }
        }

        ctx.store.write_manifest(&manifest).await?;
        self.observer.on_run_finished(true);
        Ok(PipelineResult { manifest, degraded_stages, succeeded: true, over_budget })
    }

    async fn finalize_checkpoint(&self, ctx: &ExecutionContext, stage_id: &StageId) -> Result<(String, String), PipelineError> {
        let bytes = ctx.store.read_raw_bytes(stage_id).await?;
        Ok((stage_id.filename(), sha256_hex(&bytes)))
    }

    /// Copies every checkpoint named by `plan.stages_to_skip` from
    /// `source_store` into `ctx.store`, giving the first executed stage the
    /// exact upstream bytes a full run would have produced (spec.md §8's
    /// resume-correctness property: byte-identical downstream checkpoints).
    ///
    /// Before copying, recomputes each checkpoint's SHA-256 and compares it
    /// against the hash the source run recorded in its own manifest at
    /// completion time; a mismatch means the checkpoint on disk was altered
    /// or corrupted since that run finished, and resume refuses to proceed
    /// on it.
    pub async fn prepare_resume(
        &self,
        ctx: &ExecutionContext,
        source_store: &dyn CheckpointStore,
        from_stage: u8,
    ) -> Result<(), PipelineError> {
        let plan = create_resume_execution_plan(from_stage)?;
        let source_manifest = source_store.read_manifest().await?;
        for stage_number in plan.stages_to_skip {
            let stage_id = StageId::for_stage_number(stage_number)?;
            let bytes = source_store.read_raw_bytes(&stage_id).await?;

            if let Some(expected_hash) = source_manifest.entry(&stage_id).and_then(|e| e.input_hash.as_deref()) {
                let actual_hash = sha256_hex(&bytes);
                if actual_hash != expected_hash {
                    return Err(PipelineError::IntegrityError(format!(
                        "checkpoint {} hash mismatch on resume: manifest recorded {expected_hash}, found {actual_hash}",
                        stage_id.as_str()
                    )));
                }
            }

            ctx.store.write_raw_bytes(&stage_id, &bytes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wayfarer_pipeline_domain::entities::StageStatus;
    use wayfarer_pipeline_domain::value_objects::SessionId;

    struct AlwaysOkStage {
        number: u8,
    }

    #[async_trait]
    impl Stage for AlwaysOkStage {
        fn stage_id(&self) -> StageId {
            StageId::for_stage_number(self.number).unwrap()
        }

        fn depends_on(&self) -> Vec<u8> {
            if self.number == 0 {
                vec![]
            } else {
                vec![self.number - 1]
            }
        }

        async fn run(&self, ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
            use wayfarer_pipeline_domain::entities::{Checkpoint, StageMetadata};
            let meta = StageMetadata::new(self.number, ctx.session_id.clone(), ctx.run_id.clone(), None, None)?;
            let checkpoint = Checkpoint::new(meta, serde_json::json!({"n": self.number}));
            ctx.store.write_raw(&self.stage_id(), &checkpoint).await
        }
    }

    struct AlwaysFailStage {
        number: u8,
    }

    #[async_trait]
    impl Stage for AlwaysFailStage {
        fn stage_id(&self) -> StageId {
            StageId::for_stage_number(self.number).unwrap()
        }

        fn depends_on(&self) -> Vec<u8> {
            vec![self.number - 1]
        }

        async fn run(&self, _ctx: &ExecutionContext, _manifest: &RunManifest) -> Result<(), PipelineError> {
            Err(PipelineError::processing_failed("boom"))
        }

        fn degraded_checkpoint(&self) -> serde_json::Value {
            serde_json::json!({"degraded": true})
        }
    }

    fn ctx(store: Arc<dyn CheckpointStore>) -> ExecutionContext {
        ExecutionContext::new(SessionId::from_string("2026-07-27-kyoto").unwrap(), RunId::new(), store)
    }

    #[tokio::test]
    async fn full_run_completes_all_stages() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let run_id = RunId::new();
        let store: Arc<dyn CheckpointStore> =
            Arc::new(crate::infrastructure::checkpoint::FileCheckpointStore::new(dir.path(), &session_id, &run_id));
        let context = ExecutionContext::new(session_id, run_id, store);

        let stages: Vec<Box<dyn Stage>> = (0..=2u8).map(|n| Box::new(AlwaysOkStage { number: n }) as Box<dyn Stage>).collect();
        let executor = PipelineExecutor::default();
        let result = executor.execute(stages, &context, &ExecuteOptions::default()).await.unwrap();

        assert!(result.succeeded);
        assert!(result.degraded_stages.is_empty());
        assert_eq!(result.manifest.entry(&StageId::for_stage_number(2).unwrap()).unwrap().status, StageStatus::Completed);
    }

    #[tokio::test]
    async fn failing_stage_without_continue_on_error_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let context = ctx(Arc::new(crate::infrastructure::checkpoint::FileCheckpointStore::new(
            dir.path(),
            &SessionId::from_string("2026-07-27-kyoto").unwrap(),
            &RunId::new(),
        )));
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(AlwaysOkStage { number: 0 }),
            Box::new(AlwaysFailStage { number: 1 }),
            Box::new(AlwaysOkStage { number: 2 }),
        ];
        let executor = PipelineExecutor::default();
        let result = executor.execute(stages, &context, &ExecuteOptions::default()).await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.manifest.entry(&StageId::for_stage_number(1).unwrap()).unwrap().status, StageStatus::Failed);
        assert_eq!(result.manifest.entry(&StageId::for_stage_number(2).unwrap()).unwrap().status, StageStatus::Pending);
    }

    #[tokio::test]
    async fn failing_stage_with_continue_on_error_degrades_and_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let context = ctx(Arc::new(crate::infrastructure::checkpoint::FileCheckpointStore::new(
            dir.path(),
            &SessionId::from_string("2026-07-27-kyoto").unwrap(),
            &RunId::new(),
        )));
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(AlwaysOkStage { number: 0 }),
            Box::new(AlwaysFailStage { number: 1 }),
            Box::new(AlwaysOkStage { number: 2 }),
        ];
        let executor = PipelineExecutor::default();
        let options = ExecuteOptions { continue_on_error: true, ..Default::default() };
        let result = executor.execute(stages, &context, &options).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.degraded_stages.len(), 1);
        assert_eq!(result.degraded_stages[0].stage_id.stage_number(), 1);
        assert_eq!(result.manifest.entry(&StageId::for_stage_number(2).unwrap()).unwrap().status, StageStatus::Completed);
    }

    #[tokio::test]
    async fn stop_after_stage_halts_early() {
        let dir = tempfile::tempdir().unwrap();
        let context = ctx(Arc::new(crate::infrastructure::checkpoint::FileCheckpointStore::new(
            dir.path(),
            &SessionId::from_string("2026-07-27-kyoto").unwrap(),
            &RunId::new(),
        )));
        let stages: Vec<Box<dyn Stage>> = (0..=3u8).map(|n| Box::new(AlwaysOkStage { number: n }) as Box<dyn Stage>).collect();
        let executor = PipelineExecutor::default();
        let options = ExecuteOptions { stop_after_stage: Some(1), ..Default::default() };
        let result = executor.execute(stages, &context, &options).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.manifest.entry(&StageId::for_stage_number(1).unwrap()).unwrap().status, StageStatus::Completed);
        assert_eq!(result.manifest.entry(&StageId::for_stage_number(2).unwrap()).unwrap().status, StageStatus::Pending);
    }

    #[tokio::test]
    async fn prepare_resume_copies_skipped_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let source_run_id = RunId::new();
        let source_store = crate::infrastructure::checkpoint::FileCheckpointStore::new(dir.path(), &session_id, &source_run_id);
        let source_ctx = ExecutionContext::new(session_id.clone(), source_run_id.clone(), Arc::new(
            crate::infrastructure::checkpoint::FileCheckpointStore::new(dir.path(), &session_id, &source_run_id),
        ));
        let stages: Vec<Box<dyn Stage>> = (0..=3u8).map(|n| Box::new(AlwaysOkStage { number: n }) as Box<dyn Stage>).collect();
        let executor = PipelineExecutor::default();
        executor.execute(stages, &source_ctx, &ExecuteOptions::default()).await.unwrap();

        let target_run_id = RunId::new();
        let target_ctx = ctx(Arc::new(crate::infrastructure::checkpoint::FileCheckpointStore::new(dir.path(), &session_id, &target_run_id)));
        executor.prepare_resume(&target_ctx, &source_store, 2).await.unwrap();

        assert!(target_ctx.store.exists(&StageId::for_stage_number(0).unwrap()).await);
        assert!(target_ctx.store.exists(&StageId::for_stage_number(1).unwrap()).await);
        assert!(!target_ctx.store.exists(&StageId::for_stage_number(2).unwrap()).await);
    }

    #[tokio::test]
    async fn prepare_resume_rejects_tampered_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::from_string("2026-07-27-kyoto").unwrap();
        let source_run_id = RunId::new();
        let source_store = crate::infrastructure::checkpoint::FileCheckpointStore::new(dir.path(), &session_id, &source_run_id);
        let source_ctx = ExecutionContext::new(session_id.clone(), source_run_id.clone(), Arc::new(
            crate::infrastructure::checkpoint::FileCheckpointStore::new(dir.path(), &session_id, &source_run_id),
        ));
        let stages: Vec<Box<dyn Stage>> = (0..=1u8).map(|n| Box::new(AlwaysOkStage { number: n }) as Box<dyn Stage>).collect();
        let executor = PipelineExecutor::default();
        executor.execute(stages, &source_ctx, &ExecuteOptions::default()).await.unwrap();

        let stage0_id = StageId::for_stage_number(0).unwrap();
        let tampered = serde_json::json!({"_meta": {"stageNumber": 0}, "n": 999});
        source_store.write_raw_bytes(&stage0_id, serde_json::to_vec(&tampered).unwrap().as_slice()).await.unwrap();

        let target_run_id = RunId::new();
        let target_ctx = ctx(Arc::new(crate::infrastructure::checkpoint::FileCheckpointStore::new(dir.path(), &session_id, &target_run_id)));
        let err = executor.prepare_resume(&target_ctx, &source_store, 1).await.unwrap_err();
        assert_eq!(err.category(), "integrity");
    }

    #[tokio::test]
    async fn dry_run_executes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let context = ctx(Arc::new(crate::infrastructure::checkpoint::FileCheckpointStore::new(
            dir.path(),
            &SessionId::from_string("2026-07-27-kyoto").unwrap(),
            &RunId::new(),
        )));
        let stages: Vec<Box<dyn Stage>> = vec![Box::new(AlwaysOkStage { number: 0 })];
        let executor = PipelineExecutor::default();
        let options = ExecuteOptions { dry_run: true, ..Default::default() };
        let result = executor.execute(stages, &context, &options).await.unwrap();

        assert!(result.succeeded);
        assert!(!context.store.exists(&StageId::for_stage_number(0).unwrap()).await);
    }
}
