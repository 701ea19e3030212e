//! Candidate scoring
//!
//! Five independently-capped factors summed into a 0–100-ish total. Every
//! factor is a pure function with an explicit numeric fallback on missing or
//! malformed input; a single bad candidate can never abort scoring of the
//! rest of the pool. Scores are comparable within one user's candidate set
//! only.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::collections::HashSet;
use uuid::Uuid;

use super::behavior::BehaviorPattern;
use crate::models::{InteractionEvent, MatchScore, Profile};

pub const AGE_CAP: f32 = 25.0;
pub const LOCATION_CAP: f32 = 20.0;
pub const INTEREST_CAP: f32 = 25.0;
pub const PERSONALITY_CAP: f32 = 15.0;
pub const BEHAVIOR_CAP: f32 = 15.0;

/// Aggregated interaction history with one specific target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetStats {
    pub total_weight: f32,
    pub count: u32,
}

impl TargetStats {
    pub fn mean_weight(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.total_weight / self.count as f32
        }
    }
}

/// Collapse the full event history into per-target stats, the shape the
/// behavior factor consumes.
pub fn target_stats(events: &[InteractionEvent]) -> HashMap<Uuid, TargetStats> {
    let mut stats: HashMap<Uuid, TargetStats> = HashMap::new();
    for event in events {
        let entry = stats.entry(event.target_id).or_default();
        entry.total_weight += event.weight;
        entry.count += 1;
    }
    stats
}

/// Case-insensitive exact matches between the two interest sets, reported
/// with the candidate's original casing.
pub fn mutual_interests(user: &Profile, candidate: &Profile) -> Vec<String> {
    let user_set: HashSet<String> = user.interests.iter().map(|i| i.to_lowercase()).collect();

    let mut seen: HashSet<String> = HashSet::new();
    candidate
        .interests
        .iter()
        .filter(|interest| {
            let lower = interest.to_lowercase();
            user_set.contains(&lower) && seen.insert(lower)
        })
        .cloned()
        .collect()
}

/// Score one candidate against the user, their learned pattern, and the
/// aggregated interaction stats for this specific candidate.
pub fn score_candidate(
    user: &Profile,
    candidate: &Profile,
    pattern: &BehaviorPattern,
    stats: Option<&TargetStats>,
    mutual: &[String],
    today: NaiveDate,
) -> MatchScore {
    MatchScore {
        age: age_score(user.age_on(today), candidate.age_on(today), pattern),
        location: location_score(user.city.as_deref(), candidate.city.as_deref(), pattern),
        interest: interest_score(mutual.len()),
        personality: personality_score(user.bio.as_deref(), candidate.bio.as_deref()),
        behavior: behavior_score(stats),
    }
}

/// Two-tier age rule: a candidate inside the learned preferred interval gets
/// the full cap; otherwise similarity to the user's own age decides. The
/// learned preference always outranks the self-similarity heuristic.
pub fn age_score(
    user_age: Option<i32>,
    candidate_age: Option<i32>,
    pattern: &BehaviorPattern,
) -> f32 {
    if let Some(age) = candidate_age {
        if pattern.prefers_age(age) {
            return AGE_CAP;
        }
    }

    match (user_age, candidate_age) {
        (Some(user_age), Some(candidate_age)) => {
            let diff = (user_age - candidate_age).abs();
            if diff <= 2 {
                20.0
            } else if diff <= 5 {
                15.0
            } else if diff <= 8 {
                10.0
            } else {
                5.0
            }
        }
        _ => 5.0,
    }
}

/// Same city as the user beats a learned preferred city; a candidate with no
/// usable city still gets the base 8 so missing data is not starved to zero.
pub fn location_score(
    user_city: Option<&str>,
    candidate_city: Option<&str>,
    pattern: &BehaviorPattern,
) -> f32 {
    if let (Some(user_city), Some(candidate_city)) = (user_city, candidate_city) {
        if !user_city.is_empty() && user_city.eq_ignore_ascii_case(candidate_city) {
            return LOCATION_CAP;
        }
    }

    if let Some(candidate_city) = candidate_city {
        if pattern.prefers_city(candidate_city) {
            return 15.0;
        }
    }

    8.0
}

pub fn interest_score(mutual_count: usize) -> f32 {
    (mutual_count as f32 * 8.0 + 5.0).min(INTEREST_CAP)
}

/// Lexical overlap of the two free-text descriptions: whitespace tokens
/// longer than three characters, set intersection. A missing description on
/// either side is worth a flat 10.
pub fn personality_score(user_bio: Option<&str>, candidate_bio: Option<&str>) -> f32 {
    let (Some(user_bio), Some(candidate_bio)) = (user_bio, candidate_bio) else {
        return 10.0;
    };
    if user_bio.trim().is_empty() || candidate_bio.trim().is_empty() {
        return 10.0;
    }

    let user_words = long_words(user_bio);
    let candidate_words = long_words(candidate_bio);
    let overlap = user_words.intersection(&candidate_words).count();

    (overlap as f32 * 3.0 + 5.0).min(PERSONALITY_CAP)
}

fn long_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .filter(|word| word.chars().count() > 3)
        .map(|word| word.to_lowercase())
        .collect()
}

/// Mean interaction weight with this specific candidate; with no prior
/// contact an optimistic prior of 10 applies.
pub fn behavior_score(stats: Option<&TargetStats>) -> f32 {
    match stats {
        Some(stats) if stats.count > 0 => (stats.mean_weight() * 7.0 + 3.0).min(BEHAVIOR_CAP),
        _ => 10.0,
    }
}
