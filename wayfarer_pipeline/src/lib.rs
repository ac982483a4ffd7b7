// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Wayfarer Pipeline Engine
//!
//! The checkpointed, resumable, eleven-stage discovery pipeline described
//! in spec.md: normalize -> dedupe/cluster -> rank -> validate -> top-N ->
//! aggregate -> render, driven by the executor in [`application::executor`]
//! over the filesystem-backed [`infrastructure::checkpoint`] store.
//!
//! This crate wires the domain crate's trait seams
//! (`wayfarer_pipeline_domain::repositories`, `::services`) to concrete
//! infrastructure and exposes a `run`/`resume` binary (`src/main.rs`)
//! built on `wayfarer-pipeline-bootstrap`'s CLI and signal handling.

pub mod application;
pub mod config;
pub mod infrastructure;
