// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Session
//!
//! A user's travel intent record — the durable input to a pipeline run.
//! Immutable after creation: fields are only ever read by stages, never
//! mutated (contrast with `Candidate`, which is mutated in place through
//! stage 7).

use crate::value_objects::SessionId;
use serde::{Deserialize, Serialize};

/// A user's travel intent: destinations, dates, interests, constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub title: String,
    pub destinations: Vec<String>,
    pub date_range: DateRange,
    pub flexibility: Flexibility,
    pub interests: Vec<String>,
    pub constraints: std::collections::HashMap<String, serde_json::Value>,
    pub attachments: Vec<Attachment>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl DateRange {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(0) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlexibilityType {
    Fixed,
    PlusMinusDays,
    AnyTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flexibility {
    #[serde(rename = "type")]
    pub flexibility_type: FlexibilityType,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: String,
    pub content_type: String,
    pub file_name: String,
}

impl Session {
    pub fn new(
        title: impl Into<String>,
        destinations: Vec<String>,
        date_range: DateRange,
        flexibility: Flexibility,
        interests: Vec<String>,
    ) -> Self {
        let created_at = chrono::Utc::now();
        let title = title.into();
        Self {
            session_id: SessionId::new(created_at, &title),
            title,
            destinations,
            date_range,
            flexibility,
            interests,
            constraints: std::collections::HashMap::new(),
            attachments: Vec::new(),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange {
            start: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        };
        assert_eq!(range.days(), 7);
    }

    #[test]
    fn new_session_derives_session_id_from_title_and_now() {
        let session = Session::new(
            "Kyoto Adventure",
            vec!["Kyoto".into()],
            DateRange {
                start: chrono::NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
                end: chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            },
            Flexibility {
                flexibility_type: FlexibilityType::Fixed,
                days: None,
            },
            vec!["culture".into()],
        );
        assert!(session.session_id.as_str().ends_with("kyoto-adventure"));
    }
}
