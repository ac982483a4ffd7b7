// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Services
//!
//! Domain-level behavior seams: the `Stage` trait the executor drives,
//! and the cost tracker the executor consults between stages.

pub mod cost_tracker;
pub mod stage;

pub use cost_tracker::{CostTracker, ProviderUsage};
pub use stage::{ExecutionContext, Stage};
