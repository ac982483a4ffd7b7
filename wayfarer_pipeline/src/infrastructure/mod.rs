// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure
//!
//! Everything that touches the filesystem, the clock for rate limiting,
//! an external provider, or a process-wide thread pool lives here, behind
//! the trait seams declared in `wayfarer-pipeline-domain`.

pub mod checkpoint;
pub mod concurrency;
pub mod observability;
pub mod providers;
pub mod rayon_pool;
