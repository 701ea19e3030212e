//! Insight generation
//!
//! Turns raw (user, candidate) signals into ranked, human-readable reasons.
//! Each rule fires independently; a candidate can trigger several or none.
//! An empty list means "no notable reason", not an error.

use chrono::{DateTime, Utc};

use crate::models::{InsightKind, MatchInsight, Profile};

/// Distance threshold for the proximity insight, in km.
const NEARBY_KM: f32 = 5.0;

/// Recency threshold for the activity insight, in hours.
const ACTIVE_HOURS: f64 = 24.0;

/// Distance stand-in when the two cities differ. The distance signal is a
/// same-city proxy, not geodesic math; the 5 km threshold is calibrated
/// against this binary behavior.
const FAR_AWAY_KM: f32 = 100.0;

/// Raw, unweighted facts about a (user, candidate) pair.
#[derive(Debug, Clone)]
pub struct InsightSignals {
    pub mutual_interests: Vec<String>,
    pub distance_km: f32,
    pub age_diff: Option<i32>,
    pub hours_since_active: Option<f64>,
    pub verified: bool,
    pub total_score: f32,
}

impl InsightSignals {
    pub fn derive(
        user: &Profile,
        candidate: &Profile,
        mutual_interests: Vec<String>,
        total_score: f32,
        now: DateTime<Utc>,
    ) -> Self {
        let same_city = match (user.city.as_deref(), candidate.city.as_deref()) {
            (Some(a), Some(b)) => !a.is_empty() && a.eq_ignore_ascii_case(b),
            _ => false,
        };

        let today = now.date_naive();
        let age_diff = match (user.age_on(today), candidate.age_on(today)) {
            (Some(a), Some(b)) => Some((a - b).abs()),
            _ => None,
        };

        Self {
            mutual_interests,
            distance_km: if same_city { 0.0 } else { FAR_AWAY_KM },
            age_diff,
            hours_since_active: candidate.hours_since_active(now),
            verified: candidate.is_verified,
            total_score,
        }
    }
}

/// Generate insights for one candidate, sorted descending by weight. The
/// sort is stable, so equal weights keep generation order.
pub fn generate(signals: &InsightSignals) -> Vec<MatchInsight> {
    let mut insights = Vec::with_capacity(4);

    match signals.mutual_interests.len() {
        0 => {}
        1 => {
            let mut insight = MatchInsight::new(
                InsightKind::MutualInterestSpecific,
                format!("Shared interest: {}", signals.mutual_interests[0]),
                1.0,
            );
            insight.items = Some(signals.mutual_interests.clone());
            insights.push(insight);
        }
        n => {
            let mut insight = MatchInsight::new(
                InsightKind::MutualInterestCount,
                format!("{} shared interests detected", n),
                1.0,
            );
            insight.count = Some(n);
            insight.items = Some(signals.mutual_interests.clone());
            insights.push(insight);
        }
    }

    if signals.distance_km < NEARBY_KM {
        insights.push(MatchInsight::new(
            InsightKind::LocationExact,
            "Within 5km radius",
            0.8,
        ));
    }

    if matches!(signals.hours_since_active, Some(h) if h < ACTIVE_HOURS) {
        insights.push(MatchInsight::new(
            InsightKind::HighActivity,
            "Active today",
            0.6,
        ));
    }

    if signals.age_diff == Some(0) {
        insights.push(MatchInsight::new(InsightKind::AgeExact, "Same age", 0.5));
    }

    insights.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    insights
}

/// The fixed reason attached to discovery-pool items, which bypass scoring.
pub fn discovery_insight() -> MatchInsight {
    MatchInsight::new(InsightKind::Discovery, "Discover new people", 1.0)
}
