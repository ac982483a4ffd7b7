// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # File Checkpoint Store
//!
//! Implements `CheckpointStore` against the on-disk layout
//! `<root>/sessions/<sessionId>/runs/<runId>/NN_name.json`. Writes go
//! through a temp-file-then-rename sequence in the same directory so a
//! crash mid-write never leaves a half-written checkpoint visible under
//! its final name.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use wayfarer_pipeline_domain::entities::{validate_checkpoint_structure, Checkpoint, RunManifest};
use wayfarer_pipeline_domain::error::PipelineError;
use wayfarer_pipeline_domain::repositories::CheckpointStore;
use wayfarer_pipeline_domain::value_objects::{RunId, SessionId, StageId};

pub struct FileCheckpointStore {
    sessions_root: PathBuf,
    session_id: SessionId,
    run_dir: PathBuf,
}

impl FileCheckpointStore {
    /// `root` is the deployment root; the store operates on a single
    /// `(sessionId, runId)` run directory beneath it.
    pub fn new(root: impl AsRef<Path>, session_id: &SessionId, run_id: &RunId) -> Self {
        let sessions_root = root.as_ref().join("sessions");
        let run_dir = sessions_root.join(session_id.as_str()).join("runs").join(run_id.to_string());
        Self {
            sessions_root,
            session_id: session_id.clone(),
            run_dir,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// A store for a sibling run of the same session - used by the resume
    /// planner to read a prior run's checkpoints (`sourceRunId`) without
    /// constructing the on-disk path by hand at the call site.
    pub fn for_run(&self, run_id: &RunId) -> Self {
        let run_dir = self.sessions_root.join(self.session_id.as_str()).join("runs").join(run_id.to_string());
        Self {
            sessions_root: self.sessions_root.clone(),
            session_id: self.session_id.clone(),
            run_dir,
        }
    }

    fn checkpoint_path(&self, stage_id: &StageId) -> PathBuf {
        self.run_dir.join(stage_id.filename())
    }

    fn manifest_path(&self) -> PathBuf {
        self.run_dir.join("manifest.json")
    }

    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
        let dir = path.parent().ok_or_else(|| PipelineError::io_error("checkpoint path has no parent directory"))?;
        tokio::fs::create_dir_all(dir).await?;

        let dir = dir.to_path_buf();
        let bytes = bytes.to_vec();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), PipelineError> {
            let mut temp = NamedTempFile::new_in(&dir).map_err(|e| PipelineError::io_error(e.to_string()))?;
            use std::io::Write;
            temp.write_all(&bytes).map_err(|e| PipelineError::io_error(e.to_string()))?;
            temp.as_file().sync_all().map_err(|e| PipelineError::io_error(e.to_string()))?;
            temp.persist(&path).map_err(|e| PipelineError::io_error(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| PipelineError::internal_error(e.to_string()))??;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn read_raw(&self, stage_id: &StageId) -> Result<Checkpoint<Value>, PipelineError> {
        let path = self.checkpoint_path(stage_id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| PipelineError::StageFileNotFound(path.display().to_string()))?;

        let value: Value = serde_json::from_slice(&bytes)?;
        if !validate_checkpoint_structure(&value) {
            return Err(PipelineError::InvalidCheckpoint(format!(
                "checkpoint at {} failed structural validation",
                path.display()
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn write_raw(&self, stage_id: &StageId, checkpoint: &Checkpoint<Value>) -> Result<(), PipelineError> {
        let bytes = serde_json::to_vec_pretty(checkpoint)?;
        self.write_atomic(&self.checkpoint_path(stage_id), &bytes).await
    }

    async fn exists(&self, stage_id: &StageId) -> bool {
        tokio::fs::metadata(self.checkpoint_path(stage_id)).await.is_ok()
    }

    async fn read_manifest(&self) -> Result<RunManifest, PipelineError> {
        let path = self.manifest_path();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| PipelineError::StageFileNotFound(path.display().to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_manifest(&self, manifest: &RunManifest) -> Result<(), PipelineError> {
        let bytes = serde_json::to_vec_pretty(manifest)?;
        self.write_atomic(&self.manifest_path(), &bytes).await
    }

    async fn read_raw_bytes(&self, stage_id: &StageId) -> Result<Vec<u8>, PipelineError> {
        let path = self.checkpoint_path(stage_id);
        tokio::fs::read(&path).await.map_err(|_| PipelineError::StageFileNotFound(path.display().to_string()))
    }

    async fn write_raw_bytes(&self, stage_id: &StageId, bytes: &[u8]) -> Result<(), PipelineError> {
        self.write_atomic(&self.checkpoint_path(stage_id), bytes).await
    }

    async fn write_side_artifact(&self, relative_path: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        self.write_atomic(&self.run_dir.join(relative_path), bytes).await
    }
}

/// SHA-256 of the bytes that would be written for `checkpoint`, used by
/// the executor to populate the manifest entry and by the resume planner
/// to detect corruption.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
