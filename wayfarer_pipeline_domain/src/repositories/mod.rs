// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Repositories
//!
//! Trait seams implemented by the engine crate's infrastructure layer.

pub mod checkpoint_store;

pub use checkpoint_store::{CheckpointStore, CheckpointStoreExt};
