// ============================================
// Behavior Aggregator
// ============================================
//
// Derives a behavior pattern from a user's history:
// 1. Preferred age interval (from liked profiles)
// 2. Preferred cities (from liked profiles)
// 3. Interest priorities (top 10 across liked profiles)
// 4. Messaging style (from mean sent-message length)
// 5. Engagement level (from interaction weights)
//
// The pattern is recomputed on demand from raw events and never persisted.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::models::{InteractionEvent, Profile, SentMessage};

/// Fallback mean age when neither the liked profiles nor the user supply one.
const DEFAULT_MEAN_AGE: i32 = 25;

/// Liked-profile count needed before the observed min/max span is trusted.
const MIN_AGES_FOR_RANGE: usize = 3;

/// Interest names kept after ranking by like frequency.
const MAX_INTEREST_PRIORITIES: usize = 10;

/// Derived summary of a user's revealed preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorPattern {
    /// Preferred candidate age interval [min, max].
    pub age_range: (i32, i32),
    /// Lowercased preferred city names.
    pub preferred_cities: HashSet<String>,
    /// Interest names ranked by how often they appear among liked profiles.
    pub interest_priorities: Vec<String>,
    pub messaging_style: MessagingStyle,
    /// Engagement scalar in [0, 1].
    pub engagement: f32,
}

impl BehaviorPattern {
    pub fn prefers_age(&self, age: i32) -> bool {
        age >= self.age_range.0 && age <= self.age_range.1
    }

    pub fn prefers_city(&self, city: &str) -> bool {
        self.preferred_cities.contains(&city.to_lowercase())
    }
}

/// Coarse messaging-style label from mean message length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingStyle {
    Brief,
    Conversational,
    Detailed,
    Unknown,
}

impl MessagingStyle {
    pub fn from_mean_length(mean_chars: f64) -> Self {
        if mean_chars > 100.0 {
            MessagingStyle::Detailed
        } else if mean_chars > 50.0 {
            MessagingStyle::Conversational
        } else {
            MessagingStyle::Brief
        }
    }
}

impl fmt::Display for MessagingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MessagingStyle::Brief => "brief",
            MessagingStyle::Conversational => "conversational",
            MessagingStyle::Detailed => "detailed",
            MessagingStyle::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Build the behavior pattern for `user` from their liked profiles, raw
/// interaction events, and sent messages. Pure; store failures are the
/// caller's problem.
pub fn build_pattern(
    user: &Profile,
    liked_profiles: &[Profile],
    events: &[InteractionEvent],
    messages: &[SentMessage],
    today: NaiveDate,
) -> BehaviorPattern {
    BehaviorPattern {
        age_range: compute_age_range(user, liked_profiles, today),
        preferred_cities: compute_preferred_cities(liked_profiles),
        interest_priorities: compute_interest_priorities(liked_profiles),
        messaging_style: compute_messaging_style(messages),
        engagement: compute_engagement(events),
    }
}

/// With three or more valid liked ages the observed [min, max] span is used
/// directly; below that, a mean ± 5 band. The mean falls back to the user's
/// own age, then to 25.
fn compute_age_range(user: &Profile, liked_profiles: &[Profile], today: NaiveDate) -> (i32, i32) {
    let ages: Vec<i32> = liked_profiles
        .iter()
        .filter_map(|p| p.age_on(today))
        .collect();

    if ages.len() >= MIN_AGES_FOR_RANGE {
        if let (Some(&min), Some(&max)) = (ages.iter().min(), ages.iter().max()) {
            return (min, max);
        }
    }

    let mean = if !ages.is_empty() {
        (ages.iter().sum::<i32>() as f64 / ages.len() as f64).round() as i32
    } else {
        user.age_on(today).unwrap_or(DEFAULT_MEAN_AGE)
    };

    (mean - 5, mean + 5)
}

fn compute_preferred_cities(liked_profiles: &[Profile]) -> HashSet<String> {
    liked_profiles
        .iter()
        .filter_map(|p| p.city.as_deref())
        .filter(|city| !city.is_empty())
        .map(|city| city.to_lowercase())
        .collect()
}

/// Count interest occurrences across liked profiles and keep the most
/// frequent names. The sort is stable, so ties keep insertion order.
fn compute_interest_priorities(liked_profiles: &[Profile]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for profile in liked_profiles {
        for interest in &profile.interests {
            let name = interest.to_lowercase();
            match counts.get_mut(&name) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(name.clone(), 1);
                    order.push(name);
                }
            }
        }
    }

    let mut ranked = order;
    ranked.sort_by(|a, b| counts[b].cmp(&counts[a]));
    ranked.truncate(MAX_INTEREST_PRIORITIES);
    ranked
}

fn compute_messaging_style(messages: &[SentMessage]) -> MessagingStyle {
    if messages.is_empty() {
        return MessagingStyle::Unknown;
    }

    let total_chars: usize = messages.iter().map(|m| m.body.chars().count()).sum();
    let mean = total_chars as f64 / messages.len() as f64;
    MessagingStyle::from_mean_length(mean)
}

/// Mean interaction weight normalized by the heaviest action weight (3.0),
/// clamped to [0, 1]. 0.5 is a neutral prior, not "unknown".
fn compute_engagement(events: &[InteractionEvent]) -> f32 {
    if events.is_empty() {
        return 0.5;
    }

    let mean = events.iter().map(|e| e.weight).sum::<f32>() / events.len() as f32;
    (mean / 3.0).clamp(0.0, 1.0)
}
