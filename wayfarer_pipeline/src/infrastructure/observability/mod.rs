// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Observability Service
//!
//! The runtime analogue of spec.md's "Cost tracker & logger" shared
//! side-effect collectors: a per-stage rolling throughput/error-rate
//! tracker with a derived health score, grounded in the teacher's
//! `MetricsService` (counters + gauges keyed by dimension) but scoped
//! down to what this engine actually needs — no Prometheus export
//! surface, since that belongs to the out-of-scope CLI/ops front end.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use wayfarer_pipeline_domain::value_objects::StageId;

#[derive(Debug, Default)]
struct StageCounters {
    executions: AtomicU64,
    failures: AtomicU64,
    total_duration_ms: AtomicU64,
    total_items: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageHealth {
    pub executions: u64,
    pub failures: u64,
    pub error_rate: f64,
    pub avg_duration_ms: f64,
    pub avg_throughput_items_per_sec: f64,
    /// `1.0 - error_rate`, clamped to `[0,1]` — the alerting signal a
    /// caller thresholds against (spec.md's "health score").
    pub health_score: f64,
}

/// Process-wide (per-run, in practice) collector. Safe for concurrent use
/// from stage 3's worker fan-out and every other stage; registered lazily
/// per stage id, mirroring the teacher's registry pattern.
#[derive(Default)]
pub struct ObservabilityService {
    stages: RwLock<HashMap<String, StageCounters>>,
}

impl ObservabilityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stage_run(&self, stage_id: &StageId, duration_ms: u64, item_count: usize, succeeded: bool) {
        let key = stage_id.as_str().to_string();
        {
            let stages = self.stages.read();
            if let Some(counters) = stages.get(&key) {
                Self::apply(counters, duration_ms, item_count, succeeded);
                return;
            }
        }
        let mut stages = self.stages.write();
        let counters = stages.entry(key).or_default();
        Self::apply(counters, duration_ms, item_count, succeeded);
    }

    fn apply(counters: &StageCounters, duration_ms: u64, item_count: usize, succeeded: bool) {
        counters.executions.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            counters.failures.fetch_add(1, Ordering::Relaxed);
        }
        counters.total_duration_ms.fetch_add(duration_ms, Ordering::Relaxed);
        counters.total_items.fetch_add(item_count as u64, Ordering::Relaxed);
    }

    pub fn health_for(&self, stage_id: &StageId) -> Option<StageHealth> {
        let stages = self.stages.read();
        let counters = stages.get(stage_id.as_str())?;
        let executions = counters.executions.load(Ordering::Relaxed);
        if executions == 0 {
            return None;
        }
        let failures = counters.failures.load(Ordering::Relaxed);
        let total_duration_ms = counters.total_duration_ms.load(Ordering::Relaxed);
        let total_items = counters.total_items.load(Ordering::Relaxed);
        let error_rate = failures as f64 / executions as f64;
        let avg_duration_ms = total_duration_ms as f64 / executions as f64;
        let avg_throughput_items_per_sec = if total_duration_ms > 0 {
            total_items as f64 / (total_duration_ms as f64 / 1000.0)
        } else {
            0.0
        };
        Some(StageHealth {
            executions,
            failures,
            error_rate,
            avg_duration_ms,
            avg_throughput_items_per_sec,
            health_score: (1.0 - error_rate).clamp(0.0, 1.0),
        })
    }

    /// `true` once any recorded stage's health score drops below
    /// `threshold` — the alert-threshold hook SPEC_FULL §2.2 calls for.
    pub fn any_stage_below_health(&self, threshold: f64) -> bool {
        let stages = self.stages.read();
        stages.keys().any(|key| {
            // Safe: every key was inserted via a successful `StageId::as_str`.
            let stage_id = StageId::from_string(key.clone()).expect("recorded keys are valid stage ids");
            self.health_for(&stage_id).map(|h| h.health_score < threshold).unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(n: u8) -> StageId {
        StageId::for_stage_number(n).unwrap()
    }

    #[test]
    fn records_accumulate_and_compute_health() {
        let obs = ObservabilityService::new();
        let s = stage(4);
        obs.record_stage_run(&s, 100, 50, true);
        obs.record_stage_run(&s, 200, 50, true);
        obs.record_stage_run(&s, 100, 0, false);

        let health = obs.health_for(&s).unwrap();
        assert_eq!(health.executions, 3);
        assert_eq!(health.failures, 1);
        assert!((health.error_rate - (1.0 / 3.0)).abs() < 1e-9);
        assert!((health.health_score - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn unrecorded_stage_has_no_health() {
        let obs = ObservabilityService::new();
        assert!(obs.health_for(&stage(9)).is_none());
    }

    #[test]
    fn alert_threshold_trips_on_degraded_stage() {
        let obs = ObservabilityService::new();
        let s = stage(3);
        obs.record_stage_run(&s, 50, 10, false);
        obs.record_stage_run(&s, 50, 10, false);
        assert!(obs.any_stage_below_health(0.5));
        assert!(!obs.any_stage_below_health(0.0));
    }
}
