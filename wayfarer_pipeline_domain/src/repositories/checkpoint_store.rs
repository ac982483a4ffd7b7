// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint Store
//!
//! The repository seam between the executor and the filesystem. Every
//! write goes through here so the atomic write discipline (temp file,
//! fsync, rename) lives in exactly one place (spec.md §4.1); stages and
//! the executor only ever see `read`/`write`/`exists`.

use crate::entities::{Checkpoint, RunManifest};
use crate::error::PipelineError;
use crate::value_objects::StageId;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// The object-safe repository seam: every implementation (and every
/// `Arc<dyn CheckpointStore>` held by an [`crate::services::ExecutionContext`])
/// only needs to move `serde_json::Value` payloads. Typed access for
/// stages is layered on top by [`CheckpointStoreExt`].
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Reads and structurally validates the checkpoint for `stage_id`.
    /// Returns `StageFileNotFound` if absent.
    async fn read_raw(&self, stage_id: &StageId) -> Result<Checkpoint<Value>, PipelineError>;

    /// Serializes `checkpoint` and writes it atomically: temp file in the
    /// same directory, fsync, then rename over any existing checkpoint.
    async fn write_raw(&self, stage_id: &StageId, checkpoint: &Checkpoint<Value>) -> Result<(), PipelineError>;

    async fn exists(&self, stage_id: &StageId) -> bool;

    async fn read_manifest(&self) -> Result<RunManifest, PipelineError>;

    async fn write_manifest(&self, manifest: &RunManifest) -> Result<(), PipelineError>;

    /// The exact bytes on disk for `stage_id`'s checkpoint file, used by the
    /// executor to hash the manifest entry and by resume to copy a prior
    /// run's checkpoint verbatim (spec.md §4.3: "SHA-256 of bytes on disk").
    async fn read_raw_bytes(&self, stage_id: &StageId) -> Result<Vec<u8>, PipelineError>;

    /// Writes `bytes` verbatim to `stage_id`'s checkpoint path, atomically.
    /// Used only to copy an already-validated checkpoint between runs on
    /// resume; stage output otherwise always goes through `write_raw`.
    async fn write_raw_bytes(&self, stage_id: &StageId, bytes: &[u8]) -> Result<(), PipelineError>;

    /// Writes an auxiliary run artifact that isn't itself a numbered
    /// checkpoint - `worker_outputs/<workerId>.json` (stage 3) and
    /// `results.md` (stage 10), per the on-disk layout in spec.md §6.
    /// `relative_path` is relative to the run directory; atomic write
    /// discipline applies the same as for checkpoints.
    async fn write_side_artifact(&self, relative_path: &str, bytes: &[u8]) -> Result<(), PipelineError>;
}

/// Typed convenience methods over [`CheckpointStore`], blanket-implemented
/// for every store including `dyn CheckpointStore` itself - stages call
/// `ctx.store.read::<T>(...)` without caring whether `store` is a concrete
/// type or a trait object.
#[async_trait]
pub trait CheckpointStoreExt: CheckpointStore {
    async fn read<T: DeserializeOwned>(&self, stage_id: &StageId) -> Result<Checkpoint<T>, PipelineError> {
        let raw = self.read_raw(stage_id).await?;
        Ok(Checkpoint::new(raw.meta, serde_json::from_value(raw.data)?))
    }

    async fn write<T: Serialize + Sync>(&self, stage_id: &StageId, checkpoint: &Checkpoint<T>) -> Result<(), PipelineError> {
        let value_checkpoint = Checkpoint::new(checkpoint.meta.clone(), serde_json::to_value(&checkpoint.data)?);
        self.write_raw(stage_id, &value_checkpoint).await
    }
}

impl<S: CheckpointStore + ?Sized> CheckpointStoreExt for S {}
