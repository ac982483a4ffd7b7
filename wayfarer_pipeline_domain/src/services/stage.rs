// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage
//!
//! The seam every one of the eleven pipeline stages implements. The
//! executor drives stages purely through this trait, so a stage never
//! needs to know about its neighbors, the manifest, or the checkpoint
//! store's storage details (spec.md §4.2).

use crate::entities::RunManifest;
use crate::error::PipelineError;
use crate::repositories::CheckpointStore;
use crate::value_objects::{RunId, SessionId, StageId};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a stage needs to run besides its own input checkpoint:
/// identity of the run, access to the store for sibling reads, and a
/// cancellation signal.
#[derive(Clone)]
pub struct ExecutionContext {
    pub session_id: SessionId,
    pub run_id: RunId,
    pub store: Arc<dyn CheckpointStore>,
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl ExecutionContext {
    pub fn new(session_id: SessionId, run_id: RunId, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            session_id,
            run_id,
            store,
            cancellation: tokio_util::sync::CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// One stage of the eleven-stage pipeline. `stage_id` must be constant
/// for a given implementation; `run` reads its declared upstream
/// checkpoint(s) via `ctx.store` itself rather than receiving them as
/// parameters, so the executor stays ignorant of each stage's shape.
#[async_trait]
pub trait Stage: Send + Sync {
    fn stage_id(&self) -> StageId;

    /// The stage numbers this stage reads checkpoints from. Used by the
    /// resume planner to validate a manifest's dependency chain before
    /// re-running any stage.
    fn depends_on(&self) -> Vec<u8>;

    async fn run(&self, ctx: &ExecutionContext, manifest: &RunManifest) -> Result<(), PipelineError>;

    /// The checkpoint payload the executor writes on this stage's behalf
    /// when it fails under `continueOnError`. An empty object is a safe
    /// default since every downstream reader deserializes with
    /// `#[serde(default)]` fields; stages whose downstream consumers need
    /// a non-empty shape (e.g. an empty `candidates` array) override this.
    fn degraded_checkpoint(&self) -> serde_json::Value {
        serde_json::json!({})
    }
}
