// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Wayfarer Pipeline Domain
//!
//! Pure domain layer for the travel-discovery pipeline: entities, value
//! objects, and the repository/service trait seams the engine crate
//! implements. Nothing in this crate touches the filesystem, a network
//! client, or a clock other than through `chrono::Utc::now()` for
//! timestamping - all I/O lives behind the traits in [`repositories`]
//! and [`services`].

pub mod entities;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use error::PipelineError;
