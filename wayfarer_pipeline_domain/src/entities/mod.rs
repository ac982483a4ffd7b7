// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Entities
//!
//! The domain's mutable/identity-bearing types, as distinct from the
//! self-validating value objects in [`crate::value_objects`].

pub mod candidate;
pub mod checkpoint;
pub mod cluster;
pub mod enriched_intent;
pub mod manifest;
pub mod session;
pub mod worker_output;

pub use candidate::{Candidate, CandidateMetadata, CandidateType, Confidence, Coordinates, Origin, SourceRef, Validation, ValidationStatus};
pub use checkpoint::{validate_checkpoint_structure, Checkpoint, StageMetadata, CURRENT_SCHEMA_VERSION};
pub use cluster::Cluster;
pub use enriched_intent::EnrichedIntent;
pub use manifest::{ManifestEntry, RunManifest, StageStatus};
pub use session::{Attachment, DateRange, Flexibility, FlexibilityType, Session};
pub use worker_output::{RawCandidate, WorkerAssignment, WorkerOutput, WorkerPlan, WorkerStatus};
