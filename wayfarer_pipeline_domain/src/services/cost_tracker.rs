// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Cost Tracker
//!
//! Accumulates per-provider call counts and estimated spend across a run,
//! so the executor can enforce a run-level budget cap (spec.md §4.3,
//! non-goal: no real-time billing reconciliation, just an in-run ledger).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub call_count: u64,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostTracker {
    pub by_provider: HashMap<String, ProviderUsage>,
    pub budget_usd: Option<f64>,
}

impl CostTracker {
    pub fn with_budget(budget_usd: Option<f64>) -> Self {
        Self {
            by_provider: HashMap::new(),
            budget_usd,
        }
    }

    pub fn record_call(&mut self, provider: impl Into<String>, cost_usd: f64) {
        let entry = self.by_provider.entry(provider.into()).or_default();
        entry.call_count += 1;
        entry.estimated_cost_usd += cost_usd;
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.by_provider.values().map(|u| u.estimated_cost_usd).sum()
    }

    /// `true` once the accumulated estimated spend meets or exceeds the
    /// configured budget. With no budget configured, never trips.
    pub fn is_over_budget(&self) -> bool {
        match self.budget_usd {
            Some(budget) => self.total_cost_usd() >= budget,
            None => false,
        }
    }
}
