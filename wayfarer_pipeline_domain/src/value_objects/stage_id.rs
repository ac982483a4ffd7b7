// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Identifier
//!
//! `StageId` is the `NN_name` checkpoint identifier (e.g. `04_candidates_normalized`)
//! used as both the filename stem and `_meta.stageId`. The stage number is
//! parsed out separately since the executor and resume planner operate on
//! plain `u8` stage numbers (spec.md §4.2's dependency graph is keyed on
//! stage numbers, not names).

use crate::error::PipelineError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{2}_[a-z_]+$").expect("stage id pattern is valid"))
}

/// The fixed stage-number-to-name mapping for the eleven pipeline stages.
pub const STAGE_NAMES: [(u8, &str); 11] = [
    (0, "enhancement"),
    (1, "intake"),
    (2, "router_plan"),
    (3, "worker_outputs"),
    (4, "candidates_normalized"),
    (5, "candidates_deduped"),
    (6, "candidates_ranked"),
    (7, "candidates_validated"),
    (8, "top_candidates"),
    (9, "aggregator_output"),
    (10, "results"),
];

impl StageId {
    /// Builds the canonical stage id for a known stage number (0..=10).
    pub fn for_stage_number(stage_number: u8) -> Result<Self, PipelineError> {
        let name = STAGE_NAMES
            .iter()
            .find(|(n, _)| *n == stage_number)
            .map(|(_, name)| *name)
            .ok_or_else(|| PipelineError::invalid_config(format!("no such stage number: {stage_number}")))?;
        Ok(Self(format!("{stage_number:02}_{name}")))
    }

    pub fn from_string(s: impl Into<String>) -> Result<Self, PipelineError> {
        let s = s.into();
        if !pattern().is_match(&s) {
            return Err(PipelineError::invalid_config(format!("stage id '{s}' does not match NN_name")));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the leading two-digit stage number out of the id.
    pub fn stage_number(&self) -> u8 {
        self.0[..2].parse().expect("pattern guarantees two leading digits")
    }

    pub fn filename(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StageId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_stage_number_produces_expected_ids() {
        assert_eq!(StageId::for_stage_number(0).unwrap().as_str(), "00_enhancement");
        assert_eq!(StageId::for_stage_number(4).unwrap().as_str(), "04_candidates_normalized");
        assert_eq!(StageId::for_stage_number(10).unwrap().as_str(), "10_results");
    }

    #[test]
    fn unknown_stage_number_errors() {
        assert!(StageId::for_stage_number(11).is_err());
    }

    #[test]
    fn stage_number_round_trips() {
        for n in 0..=10u8 {
            let id = StageId::for_stage_number(n).unwrap();
            assert_eq!(id.stage_number(), n);
        }
    }

    #[test]
    fn rejects_malformed_pattern() {
        assert!(StageId::from_string("4_foo").is_err());
        assert!(StageId::from_string("04-foo").is_err());
        assert!(StageId::from_string("04_Foo").is_err());
    }

    #[test]
    fn filename_appends_json() {
        let id = StageId::for_stage_number(5).unwrap();
        assert_eq!(id.filename(), "05_candidates_deduped.json");
    }
}
