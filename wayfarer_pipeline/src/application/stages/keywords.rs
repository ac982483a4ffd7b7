// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Interest Keyword Sets
//!
//! Shared between stage 1's intent enrichment (inferring extra tags from a
//! user's free-text interests) and stage 6's ranker (per-type bonus,
//! spec.md §4.7: "food <-> {food, culinary, ...}"). Keeping one table
//! means the tags the ranker rewards are the same ones intake can infer.

use wayfarer_pipeline_domain::entities::CandidateType;

pub const FOOD_KEYWORDS: &[&str] = &["food", "culinary", "cuisine", "dining", "restaurant", "street food"];
pub const ACTIVITY_KEYWORDS: &[&str] = &["adventure", "outdoor", "hiking", "sports", "active"];
pub const EXPERIENCE_KEYWORDS: &[&str] = &["culture", "local", "authentic", "immersive", "tradition"];

/// The keyword set associated with a candidate type, per spec.md §4.7.
/// `place`, `neighborhood`, and `daytrip` have no associated set.
pub fn keywords_for_type(candidate_type: CandidateType) -> &'static [&'static str] {
    match candidate_type {
        CandidateType::Food => FOOD_KEYWORDS,
        CandidateType::Activity => ACTIVITY_KEYWORDS,
        CandidateType::Experience => EXPERIENCE_KEYWORDS,
        CandidateType::Place | CandidateType::Neighborhood | CandidateType::Daytrip => &[],
    }
}

/// Tags inferred from a user's free-text interests during stage 1 intake:
/// each interest that substring-matches a keyword set also contributes
/// that set's canonical lead term as an inferred tag.
pub fn infer_tags(interests: &[String]) -> Vec<String> {
    let lowered: Vec<String> = interests.iter().map(|s| s.to_lowercase()).collect();
    let mut inferred = Vec::new();
    for (lead, set) in [("culinary", FOOD_KEYWORDS), ("outdoor", ACTIVITY_KEYWORDS), ("culture", EXPERIENCE_KEYWORDS)] {
        let matches = lowered.iter().any(|interest| set.iter().any(|kw| interest.contains(kw) || kw.contains(interest.as_str())));
        if matches && !lowered.iter().any(|i| i == lead) {
            inferred.push(lead.to_string());
        }
    }
    inferred
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_culinary_from_food_interest() {
        let tags = infer_tags(&["food".to_string(), "museums".to_string()]);
        assert!(tags.contains(&"culinary".to_string()));
    }

    #[test]
    fn no_interests_infers_nothing() {
        assert!(infer_tags(&[]).is_empty());
    }

    #[test]
    fn keyword_sets_match_spec_assignment() {
        assert!(!keywords_for_type(CandidateType::Food).is_empty());
        assert!(!keywords_for_type(CandidateType::Activity).is_empty());
        assert!(!keywords_for_type(CandidateType::Experience).is_empty());
        assert!(keywords_for_type(CandidateType::Place).is_empty());
    }
}
