// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Stages
//!
//! The eleven `Stage` implementations (spec.md §4.5-§4.8), numbered 0
//! through 10. Each module owns its own input/output shapes; the executor
//! never sees them, only the `Stage` trait.

mod keywords;
pub mod stage0_enhancement;
pub mod stage1_intake;
pub mod stage2_router_plan;
pub mod stage3_worker_pool;
pub mod stage4_normalize;
pub mod stage5_dedupe;
pub mod stage6_rank;
pub mod stage7_validate;
pub mod stage8_select;
pub mod stage9_aggregate;
pub mod stage10_render;

pub use stage0_enhancement::EnhancementStage;
pub use stage1_intake::IntakeStage;
pub use stage2_router_plan::RouterPlanStage;
pub use stage3_worker_pool::WorkerPoolStage;
pub use stage4_normalize::NormalizeStage;
pub use stage5_dedupe::DedupeStage;
pub use stage6_rank::RankStage;
pub use stage7_validate::ValidateStage;
pub use stage8_select::SelectStage;
pub use stage9_aggregate::AggregateStage;
pub use stage10_render::RenderStage;
