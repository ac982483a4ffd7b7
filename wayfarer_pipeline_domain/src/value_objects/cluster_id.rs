// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Cluster Identifier
//!
//! `clusterId = "cluster_" + zero-padded index in output order` (spec.md
//! §4.6), assigned by the dedupe/cluster engine once cluster order is
//! final.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn for_index(index: usize) -> Self {
        Self(format!("cluster_{index:04}"))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
