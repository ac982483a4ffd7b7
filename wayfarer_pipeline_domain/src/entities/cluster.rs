// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Cluster
//!
//! An equivalence class of candidates deemed the same underlying entity,
//! produced by stage 5. `representative` carries the merged fields
//! (source refs, tags) forward as the `Candidate` that exits stage 5;
//! `alternates` are attached metadata, not separately emitted (spec
//! invariant 3: two candidates with the same `clusterId` never both exit
//! stage 5).

use crate::entities::candidate::Candidate;
use crate::value_objects::ClusterId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: ClusterId,
    pub representative: Candidate,
    pub alternates: Vec<Candidate>,
    pub member_count: usize,
}

impl Cluster {
    pub fn new(cluster_id: ClusterId, representative: Candidate, alternates: Vec<Candidate>, member_count: usize) -> Self {
        debug_assert!(alternates.len() <= 3, "clusters cap alternates at 3");
        Self {
            cluster_id,
            representative,
            alternates,
            member_count,
        }
    }
}
