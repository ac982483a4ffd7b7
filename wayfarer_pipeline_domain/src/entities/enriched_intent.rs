// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Enriched Intent
//!
//! A `Session` projected through intent extraction (stages 1-2): the same
//! fields plus `inferred_tags`, consumed by the worker pool (to build query
//! plans) and the ranker (relevance scoring).

use crate::entities::session::{Attachment, DateRange, Flexibility, Session};
use crate::value_objects::SessionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedIntent {
    pub session_id: SessionId,
    pub title: String,
    pub destinations: Vec<String>,
    pub date_range: DateRange,
    pub flexibility: Flexibility,
    pub interests: Vec<String>,
    pub constraints: std::collections::HashMap<String, serde_json::Value>,
    pub attachments: Vec<Attachment>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Tags inferred from free-text interests/constraints/attachments during
    /// stage 1-2 intent extraction (e.g. "culture" -> also infers "history").
    pub inferred_tags: Vec<String>,
}

impl EnrichedIntent {
    pub fn from_session(session: Session, inferred_tags: Vec<String>) -> Self {
        Self {
            session_id: session.session_id,
            title: session.title,
            destinations: session.destinations,
            date_range: session.date_range,
            flexibility: session.flexibility,
            interests: session.interests,
            constraints: session.constraints,
            attachments: session.attachments,
            created_at: session.created_at,
            inferred_tags,
        }
    }

    /// Interests unioned with inferred tags, lowercased - the set used by
    /// the ranker's interest-overlap scoring (spec.md §4.7).
    pub fn interest_terms(&self) -> std::collections::HashSet<String> {
        self.interests
            .iter()
            .chain(self.inferred_tags.iter())
            .map(|s| s.to_lowercase())
            .collect()
    }
}
