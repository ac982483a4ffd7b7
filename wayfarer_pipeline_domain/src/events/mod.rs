// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Events
//!
//! Observation hooks the executor calls out to; no domain state lives
//! here.

pub mod processing_observer;

pub use processing_observer::{NullObserver, ProcessingObserver, StageOutcome};
