// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Value Objects
//!
//! Small, immutable, self-validating identifiers used throughout the
//! pipeline. Each wraps a `String` in a specific validated format rather
//! than a generic UUID/ULID, because the discovery pipeline's identifiers
//! are themselves meaningful (date-slugs, content hashes, stage names) per
//! the data model in the specification.

pub mod candidate_id;
pub mod cluster_id;
pub mod run_id;
pub mod session_id;
pub mod stage_id;

pub use candidate_id::CandidateId;
pub use cluster_id::ClusterId;
pub use run_id::RunId;
pub use session_id::SessionId;
pub use stage_id::StageId;

/// Lowercases, strips non-alphanumeric characters, and collapses whitespace.
///
/// Used by id derivation (candidate ids, content hashes) and by similarity
/// scoring (title/location token normalization) so both paths agree on what
/// "the same text" means.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = true; // suppress leading space
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Extracts the "city" component of a free-text location string: the last
/// comma-separated segment, normalized. Empty input yields an empty city.
pub fn city(location_text: &str) -> String {
    match location_text.rsplit(',').next() {
        Some(segment) => normalize_text(segment),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_punctuation_and_case() {
        assert_eq!(normalize_text("Tokyo Tower!!  Observation-Deck"), "tokyo tower observation deck");
    }

    #[test]
    fn normalize_empty_is_empty() {
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn city_takes_last_segment() {
        assert_eq!(city("Tokyo Tower, Minato, Tokyo"), "tokyo");
        assert_eq!(city(""), "");
        assert_eq!(city("Just One Segment"), "just one segment");
    }
}
