// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # `wayfarer` CLI
//!
//! The thin binary that wires `wayfarer-pipeline-bootstrap`'s CLI parsing
//! and signal handling to this crate's executor and stages. Everything
//! bootstrap-layer (argument validation, exit codes, platform info,
//! graceful shutdown) lives in that crate; this file only translates a
//! [`ValidatedCli`] into an [`ExecuteOptions`] and a stage list.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use wayfarer_pipeline::application::executor::{ExecuteOptions, PipelineExecutor};
use wayfarer_pipeline::application::stages::{
    AggregateStage, DedupeStage, EnhancementStage, IntakeStage, NormalizeStage, RankStage, RenderStage, RouterPlanStage, SelectStage, ValidateStage,
    WorkerPoolStage,
};
use wayfarer_pipeline::config::RunConfig;
use wayfarer_pipeline::infrastructure::checkpoint::FileCheckpointStore;
use wayfarer_pipeline::infrastructure::providers::{FakeFactChecker, FakeNarrativeGenerator, FakeProviderClient, ProviderClient};
use wayfarer_pipeline_bootstrap::{bootstrap_cli, cli::ValidatedCommand, map_error_to_exit_code, ExitCode};
use wayfarer_pipeline_bootstrap::shutdown::ShutdownCoordinator;
use wayfarer_pipeline_bootstrap::signals::install_shutdown_handler;
use wayfarer_pipeline_domain::entities::Session;
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStore;
use wayfarer_pipeline_domain::services::{CostTracker, ExecutionContext, Stage};
use wayfarer_pipeline_domain::value_objects::RunId;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::Usage.into();
        }
    };

    init_tracing(cli.verbose);

    let coordinator = ShutdownCoordinator::default();
    install_shutdown_handler(coordinator.clone());

    match run(cli, coordinator).await {
        Ok(()) => ExitCode::Ok.into(),
        Err(err) => {
            tracing::error!(error = %err, category = err.category(), "run failed");
            map_error_to_exit_code(err.category()).into()
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run(cli: wayfarer_pipeline_bootstrap::ValidatedCli, coordinator: ShutdownCoordinator) -> Result<(), PipelineError> {
    let run_config = load_run_config(&cli)?;

    match cli.command {
        ValidatedCommand::Run {
            session,
            dry_run,
            stop_after_stage,
            continue_on_error,
        } => {
            let session = load_session(&session)?;
            let options = ExecuteOptions {
                dry_run,
                from_stage: None,
                source_run_id: None,
                stop_after_stage,
                continue_on_error,
            };
            execute_run(session, run_config, options, None, coordinator).await
        }
        ValidatedCommand::Resume {
            session,
            source_run_id,
            from_stage,
            stop_after_stage,
            continue_on_error,
        } => {
            let session = load_session(&session)?;
            let source_run_id = RunId::from_string(&source_run_id)?;
            let options = ExecuteOptions {
                dry_run: false,
                from_stage: Some(from_stage),
                source_run_id: Some(source_run_id.clone()),
                stop_after_stage,
                continue_on_error,
            };
            execute_run(session, run_config, options, Some(source_run_id), coordinator).await
        }
        ValidatedCommand::ShowManifest { session, run_id } => {
            let session = load_session(&session)?;
            let run_id = RunId::from_string(&run_id)?;
            show_manifest(&run_config.root, &session.session_id, &run_id).await
        }
    }
}

fn load_run_config(cli: &wayfarer_pipeline_bootstrap::ValidatedCli) -> Result<RunConfig, PipelineError> {
    let mut run_config = RunConfig::load(cli.config.as_deref())?;
    if let Some(root) = &cli.root {
        run_config.root = root.clone();
    }
    Ok(run_config)
}

fn load_session(path: &Path) -> Result<Session, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::io_error(format!("reading session file {}: {e}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::ValidationError(format!("session file {} is not a valid session: {e}", path.display())))
}

/// Registers the deterministic fake provider/LLM clients every stage
/// needing one falls back to. Real vendor clients are an external
/// collaborator per spec.md §1 - out of scope for this engine; the fakes
/// keep the pipeline runnable end-to-end without network access.
fn default_providers() -> HashMap<String, Arc<dyn ProviderClient>> {
    let mut providers: HashMap<String, Arc<dyn ProviderClient>> = HashMap::new();
    providers.insert("web".into(), Arc::new(FakeProviderClient::new("web")));
    providers.insert("places".into(), Arc::new(FakeProviderClient::new("places")));
    providers.insert("youtube".into(), Arc::new(FakeProviderClient::new("youtube")));
    providers
}

async fn execute_run(
    session: Session,
    run_config: RunConfig,
    options: ExecuteOptions,
    source_run_id: Option<RunId>,
    coordinator: ShutdownCoordinator,
) -> Result<(), PipelineError> {
    let session_id = session.session_id.clone();
    let run_id = RunId::new();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(&run_config.root, &session_id, &run_id));
    let ctx = ExecutionContext::new(session_id.clone(), run_id.clone(), store.clone());

    // Bridges bootstrap's own CancellationToken (fed by SIGINT/SIGTERM/SIGHUP)
    // to the tokio_util token the executor polls between stages.
    let shutdown_token = coordinator.token();
    let bridged = ctx.cancellation.clone();
    tokio::spawn(async move {
        shutdown_token.cancelled().await;
        bridged.cancel();
    });

    let cost_tracker = Arc::new(Mutex::new(CostTracker::with_budget(run_config.budget_usd)));
    let executor = PipelineExecutor::default().with_cost_tracker(cost_tracker.clone());

    if let (Some(from_stage), Some(source_run_id)) = (options.from_stage, source_run_id.clone()) {
        if from_stage > 0 {
            let source_store = FileCheckpointStore::new(&run_config.root, &session_id, &source_run_id);
            executor.prepare_resume(&ctx, &source_store, from_stage).await?;
        }
    }

    let from_stage = options.from_stage.unwrap_or(0);
    let top_k = if run_config.flags.skip_validation { 0 } else { run_config.limits.max_validations };

    let all_stages: Vec<Box<dyn Stage>> = vec![
        Box::new(EnhancementStage::new(session, run_config.clone())),
        Box::new(IntakeStage),
        Box::new(RouterPlanStage::new(run_config.clone())),
        Box::new(WorkerPoolStage::new(default_providers(), run_config.worker_concurrency)),
        Box::new(NormalizeStage),
        Box::new(DedupeStage),
        Box::new(RankStage),
        Box::new(ValidateStage::new(Arc::new(FakeFactChecker::new()), top_k)),
        Box::new(SelectStage::new(run_config.limits.max_top_candidates)),
        Box::new(AggregateStage::new(
            Arc::new(FakeNarrativeGenerator::new()),
            cost_tracker.clone(),
        )),
        Box::new(RenderStage::new()),
    ];

    let stages: Vec<Box<dyn Stage>> = all_stages.into_iter().filter(|s| s.stage_id().stage_number() >= from_stage).collect();

    let result = executor.execute(stages, &ctx, &options).await?;
    if !result.succeeded {
        return Err(PipelineError::ProcessingFailed(format!("run {} for session {} did not complete", run_id, session_id)));
    }
    tracing::info!(
        run_id = %run_id,
        session_id = %session_id,
        degraded = result.degraded_stages.len(),
        over_budget = result.over_budget,
        "run completed"
    );
    Ok(())
}

async fn show_manifest(root: &Path, session_id: &wayfarer_pipeline_domain::value_objects::SessionId, run_id: &RunId) -> Result<(), PipelineError> {
    let store = FileCheckpointStore::new(root, session_id, run_id);
    let manifest = store.read_manifest().await?;

    println!("run {} (session {})", manifest.run_id, manifest.session_id);
    println!("created {}  updated {}", manifest.created_at.to_rfc3339(), manifest.updated_at.to_rfc3339());
    for entry in &manifest.stages {
        let checkpoint = entry.checkpoint_path.as_deref().unwrap_or("-");
        println!("  {:<24} {:<10} {}", entry.stage_id.as_str(), format!("{:?}", entry.status), checkpoint);
        if let Some(error) = &entry.error {
            println!("    error: {error}");
        }
    }
    let failed = manifest.stages.iter().filter(|e| e.status == wayfarer_pipeline_domain::entities::StageStatus::Failed).count();
    if failed > 0 {
        println!("{failed} stage(s) failed");
    }
    Ok(())
}
