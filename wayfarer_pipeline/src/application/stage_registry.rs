// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Registry & Dependency Graph
//!
//! Pure functions over the fixed, linear eleven-stage topology (spec.md
//! §4.2). Every stage's sole upstream is the previous stage by number;
//! these helpers exist anyway, rather than hard-coding `n - 1` at call
//! sites, so the interface extends cleanly if the topology ever stops
//! being a straight line.

use wayfarer_pipeline_domain::error::PipelineError;

pub const FIRST_STAGE: u8 = 0;
pub const LAST_STAGE: u8 = 10;

/// Stage numbers `n` depends on: every stage before it.
pub fn get_upstream_stages(n: u8) -> Vec<u8> {
    (FIRST_STAGE..n).collect()
}

/// Stage numbers that depend on `n`: every stage after it.
pub fn get_downstream_stages(n: u8) -> Vec<u8> {
    ((n + 1)..=LAST_STAGE).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeExecutionPlan {
    /// Stage numbers skipped entirely - their checkpoints are loaded from
    /// `sourceRunId` rather than re-executed.
    pub stages_to_skip: Vec<u8>,
    /// Stage numbers the executor actually runs, in order.
    pub stages_to_execute: Vec<u8>,
    /// The stage number whose checkpoint feeds the first executed stage.
    /// `None` for `fromStage == 0` (a full run has no input edge to copy).
    pub input_stage: Option<u8>,
}

/// Builds a resume plan for restarting at `from_stage`. `from_stage == 0`
/// degenerates to a full run per spec.md §9's open question: there is no
/// upstream to skip or copy.
pub fn create_resume_execution_plan(from_stage: u8) -> Result<ResumeExecutionPlan, PipelineError> {
    if from_stage > LAST_STAGE {
        return Err(PipelineError::invalid_config(format!("fromStage {from_stage} out of range 0..={LAST_STAGE}")));
    }
    Ok(ResumeExecutionPlan {
        stages_to_skip: get_upstream_stages(from_stage),
        stages_to_execute: (from_stage..=LAST_STAGE).collect(),
        input_stage: if from_stage == 0 { None } else { Some(from_stage - 1) },
    })
}

/// Validates that a prior-run checkpoint loaded for resume is compatible
/// with the stage about to consume it: its `_meta` parses and its
/// `stageNumber` matches what the plan expects.
pub fn validate_stage_file(data: &serde_json::Value, expected_stage_number: u8) -> Result<(), PipelineError> {
    if !wayfarer_pipeline_domain::entities::validate_checkpoint_structure(data) {
        return Err(PipelineError::InvalidCheckpoint(format!(
            "checkpoint for stage {expected_stage_number} failed structural validation"
        )));
    }
    let meta: wayfarer_pipeline_domain::entities::StageMetadata = serde_json::from_value(
        data.get("_meta").expect("validate_checkpoint_structure guarantees _meta exists").clone(),
    )?;
    if meta.stage_number != expected_stage_number {
        return Err(PipelineError::InvalidCheckpoint(format!(
            "expected checkpoint for stage {expected_stage_number}, found stage {}",
            meta.stage_number
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn upstream_and_downstream_partition_the_range() {
        assert_eq!(get_upstream_stages(4), vec![0, 1, 2, 3]);
        assert_eq!(get_downstream_stages(4), vec![5, 6, 7, 8, 9, 10]);
        assert!(get_upstream_stages(0).is_empty());
        assert!(get_downstream_stages(10).is_empty());
    }

    #[test]
    fn resume_plan_from_middle_stage() {
        let plan = create_resume_execution_plan(8).unwrap();
        assert_eq!(plan.stages_to_skip, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(plan.stages_to_execute, vec![8, 9, 10]);
        assert_eq!(plan.input_stage, Some(7));
    }

    #[test]
    fn resume_plan_from_stage_zero_is_a_full_run() {
        let plan = create_resume_execution_plan(0).unwrap();
        assert!(plan.stages_to_skip.is_empty());
        assert_eq!(plan.stages_to_execute.len(), 11);
        assert_eq!(plan.input_stage, None);
    }

    #[test]
    fn resume_plan_rejects_out_of_range_stage() {
        assert!(create_resume_execution_plan(11).is_err());
    }

    proptest! {
        /// For any valid `fromStage`, skip+execute partitions `0..=10`
        /// exactly once each, and re-planning for the same `fromStage`
        /// always yields the same plan (resume is idempotent in the
        /// stages it selects).
        #[test]
        fn resume_plan_partitions_the_full_range(from_stage in 0u8..=10) {
            let plan = create_resume_execution_plan(from_stage).unwrap();
            let mut all: Vec<u8> = plan.stages_to_skip.iter().chain(plan.stages_to_execute.iter()).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..=10u8).collect::<Vec<_>>());

            let replanned = create_resume_execution_plan(from_stage).unwrap();
            prop_assert_eq!(plan, replanned);
        }
    }
}
