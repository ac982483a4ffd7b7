// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Run Configuration
//!
//! Every option enumerated in spec.md §6, loaded through a layered stack
//! (defaults → TOML file → environment variables) with the `config` crate,
//! mirroring the teacher's `ConfigService`/`GenericConfigManager` split:
//! sensible hard-coded defaults, an optional file, then env overrides
//! prefixed `WAYFARER_` (e.g. `WAYFARER_LIMITS__WORKER_TIMEOUT_MS=20000`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wayfarer_pipeline_domain::error::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub max_candidates_per_worker: usize,
    pub max_top_candidates: usize,
    pub max_validations: usize,
    pub worker_timeout_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_candidates_per_worker: 25,
            max_top_candidates: 50,
            max_validations: 10,
            worker_timeout_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flags {
    pub skip_enhancement: bool,
    pub skip_validation: bool,
    pub skip_youtube: bool,
}

/// Run-level engine configuration: spec.md §6's enumerated options plus
/// the root-directory override for the on-disk layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub from_stage: Option<u8>,
    #[serde(default)]
    pub stop_after_stage: Option<u8>,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub source_run_id: Option<String>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub flags: Flags,
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Concurrency cap for the stage-3 worker pool (spec default: 3).
    #[serde(default = "default_concurrency")]
    pub worker_concurrency: usize,
    /// Hard budget for the cost tracker; `None` never trips.
    #[serde(default)]
    pub budget_usd: Option<f64>,
}

fn default_root() -> PathBuf {
    PathBuf::from("./wayfarer-data")
}

fn default_concurrency() -> usize {
    crate::infrastructure::concurrency::DEFAULT_LIMIT
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            from_stage: None,
            stop_after_stage: None,
            continue_on_error: false,
            source_run_id: None,
            limits: Limits::default(),
            flags: Flags::default(),
            root: default_root(),
            worker_concurrency: default_concurrency(),
            budget_usd: None,
        }
    }
}

impl RunConfig {
    /// Layers defaults, an optional TOML file, and `WAYFARER_`-prefixed
    /// environment variables (double-underscore nested separator), then
    /// validates the result.
    pub fn load(config_path: Option<&Path>) -> Result<Self, PipelineError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("dry_run", defaults.dry_run)
            .and_then(|b| b.set_default("continue_on_error", defaults.continue_on_error))
            .and_then(|b| b.set_default("root", defaults.root.to_string_lossy().to_string()))
            .and_then(|b| b.set_default("worker_concurrency", defaults.worker_concurrency as i64))
            .and_then(|b| b.set_default("limits.max_candidates_per_worker", defaults.limits.max_candidates_per_worker as i64))
            .and_then(|b| b.set_default("limits.max_top_candidates", defaults.limits.max_top_candidates as i64))
            .and_then(|b| b.set_default("limits.max_validations", defaults.limits.max_validations as i64))
            .and_then(|b| b.set_default("limits.worker_timeout_ms", defaults.limits.worker_timeout_ms as i64))
            .and_then(|b| b.set_default("flags.skip_enhancement", defaults.flags.skip_enhancement))
            .and_then(|b| b.set_default("flags.skip_validation", defaults.flags.skip_validation))
            .and_then(|b| b.set_default("flags.skip_youtube", defaults.flags.skip_youtube))
            .map_err(|e| PipelineError::invalid_config(format!("failed to seed configuration defaults: {e}")))?;

        if let Some(path) = config_path {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WAYFARER")
                .separator("__")
                .try_parsing(true),
        );

        let loaded = builder
            .build()
            .map_err(|e| PipelineError::invalid_config(format!("failed to build run configuration: {e}")))?;
        let mut run_config: RunConfig = loaded
            .try_deserialize()
            .map_err(|e| PipelineError::invalid_config(format!("failed to parse run configuration: {e}")))?;

        if let Ok(root) = std::env::var("WAYFARER_ROOT") {
            run_config.root = PathBuf::from(root);
        }

        run_config.validate()?;
        Ok(run_config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(stage) = self.from_stage {
            if stage > 10 {
                return Err(PipelineError::invalid_config(format!("fromStage {stage} out of range 0..=10")));
            }
            if stage > 0 && self.source_run_id.is_none() {
                return Err(PipelineError::invalid_config("fromStage > 0 requires sourceRunId"));
            }
        }
        if let Some(stage) = self.stop_after_stage {
            if stage > 10 {
                return Err(PipelineError::invalid_config(format!("stopAfterStage {stage} out of range 0..=10")));
            }
        }
        if self.limits.max_top_candidates == 0 {
            return Err(PipelineError::invalid_config("limits.maxTopCandidates must be > 0"));
        }
        if self.worker_concurrency == 0 {
            return Err(PipelineError::invalid_config("workerConcurrency must be > 0"));
        }
        Ok(())
    }
}
