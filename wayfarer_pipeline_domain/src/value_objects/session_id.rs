// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Session Identifier
//!
//! A `SessionId` is a date-slug: a human-traceable identifier of the form
//! `YYYY-MM-DD-<slug>` where `<slug>` is a short lowercase token derived
//! from the session title. Sessions are created once and are immutable, so
//! the id only needs to be unique and sortable, not time-ordered to
//! microsecond precision the way stage/run ids are.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Builds a session id from a creation date and a title, slugifying the
    /// title (lowercase, non-alphanumeric runs collapsed to a single `-`,
    /// trimmed to 40 chars).
    pub fn new(created_at: chrono::DateTime<chrono::Utc>, title: &str) -> Self {
        let slug = slugify(title);
        Self(format!("{}-{}", created_at.format("%Y-%m-%d"), slug))
    }

    /// Parses and validates an existing session id string.
    pub fn from_string(s: impl Into<String>) -> Result<Self, PipelineError> {
        let s = s.into();
        validate(&s)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = true;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    let truncated: String = slug.chars().take(40).collect();
    if truncated.is_empty() {
        "session".to_string()
    } else {
        truncated
    }
}

fn validate(s: &str) -> Result<(), PipelineError> {
    if s.len() < 11 || s.as_bytes()[4] != b'-' || s.as_bytes()[7] != b'-' {
        return Err(PipelineError::invalid_config(format!(
            "session id '{s}' does not match the YYYY-MM-DD-<slug> format"
        )));
    }
    Ok(())
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}
