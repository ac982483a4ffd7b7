// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Candidate
//!
//! The central entity flowing through stages 3-10: a normalized discovery
//! item (place, activity, neighborhood, day trip, experience, or food).
//! Created at stage 3 (as raw `WorkerOutput` payloads), normalized into
//! `Candidate` shape at stage 4, then mutated in place (id, confidence,
//! tags, metadata, score, cluster id, validation) through stage 7.

use crate::value_objects::{CandidateId, ClusterId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateType {
    Place,
    Activity,
    Neighborhood,
    Daytrip,
    Experience,
    Food,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Web,
    Places,
    Youtube,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Web => "web",
            Origin::Places => "places",
            Origin::Youtube => "youtube",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    NeedsVerification,
    Provisional,
    Verified,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Verified,
    PartiallyVerified,
    ConflictDetected,
    Unverified,
    NotApplicable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub status: ValidationStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    pub publisher: Option<String>,
    pub retrieved_at: chrono::DateTime<chrono::Utc>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Haversine distance in meters.
    pub fn distance_meters(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_M * c
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub place_id: Option<String>,
    pub rating: Option<f64>,
    pub view_count: Option<u64>,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    pub price_level: Option<u8>,
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: CandidateId,
    #[serde(rename = "type")]
    pub candidate_type: CandidateType,
    pub title: String,
    pub summary: String,
    pub location_text: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub tags: Vec<String>,
    pub origin: Origin,
    pub source_refs: Vec<SourceRef>,
    pub confidence: Confidence,
    pub validation: Option<Validation>,
    pub score: f64,
    pub cluster_id: Option<ClusterId>,
    pub metadata: CandidateMetadata,
}

impl Candidate {
    /// Invariant 1 (spec.md §3): non-empty id is required of every
    /// candidate emitted downstream of normalization.
    pub fn has_valid_id(&self) -> bool {
        !self.candidate_id.as_str().is_empty()
    }

    /// Invariant enforced at every write site: `score` stays in `[0, 100]`.
    pub fn clamp_score(&mut self) {
        self.score = self.score.clamp(0.0, 100.0);
    }

    /// Invariant 2 (spec.md §3): no duplicate URLs in `source_refs` after
    /// stage 5. Dedup keeps the first occurrence.
    pub fn dedup_source_refs(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.source_refs.retain(|r| seen.insert(r.url.clone()));
    }

    pub fn text_for_matching(&self) -> String {
        format!(
            "{} {} {}",
            self.location_text.clone().unwrap_or_default(),
            self.title,
            self.summary
        )
    }
}
