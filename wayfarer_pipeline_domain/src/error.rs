// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single hierarchical error type for the discovery pipeline domain.
//! Variants are grouped by failure category so that stage implementations,
//! the worker pool, and the executor can dispatch recovery behavior
//! (retry, degrade, abort) on `category()` / `is_recoverable()` rather than
//! matching on specific variants throughout the codebase.

use thiserror::Error;

/// Domain-specific errors for the discovery pipeline.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    #[error("Stage file not found: {0}")]
    StageFileNotFound(String),

    #[error("Checkpoint integrity error: {0}")]
    IntegrityError(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("External provider error: {0}")]
    ExternalProviderError(String),

    #[error("Circuit breaker open for provider: {0}")]
    CircuitOpen(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Metrics error: {0}")]
    MetricsError(String),
}

impl PipelineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error indicates a transient condition worth retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::TimeoutError(_) | PipelineError::ResourceExhausted(_) | PipelineError::IoError(_)
        )
    }

    /// Gets the error category, used for logging/metrics dimensioning and by
    /// the executor to decide whether a `StageFailure` should be fatal or
    /// degraded.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidConfiguration(_) => "configuration",
            PipelineError::InvalidCheckpoint(_) => "checkpoint",
            PipelineError::StageFileNotFound(_) => "checkpoint",
            PipelineError::IntegrityError(_) => "integrity",
            PipelineError::ProcessingFailed(_) => "processing",
            PipelineError::ExternalProviderError(_) => "external",
            PipelineError::CircuitOpen(_) => "circuit",
            PipelineError::ValidationError(_) => "validation",
            PipelineError::ResourceExhausted(_) => "resource",
            PipelineError::IoError(_) => "io",
            PipelineError::SerializationError(_) => "serialization",
            PipelineError::TimeoutError(_) => "timeout",
            PipelineError::Cancelled(_) => "cancellation",
            PipelineError::SessionNotFound(_) => "session",
            PipelineError::InternalError(_) => "internal",
            PipelineError::MetricsError(_) => "metrics",
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}
