// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Filesystem implementation of the [`wayfarer_pipeline_domain::repositories::CheckpointStore`] seam.

mod file_store;

pub use file_store::{sha256_hex, FileCheckpointStore};
