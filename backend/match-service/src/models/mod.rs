use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User profile as stored by the profile store. Read-only for the engine.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub gender: String,
    /// Genders this user wants to see. Empty means no gender filter.
    pub interested_in: Vec<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub city: Option<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Age in whole years at `today`, if the date of birth is usable.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let dob = self.date_of_birth?;
        let age = today.years_since(dob)? as i32;
        if age > 0 {
            Some(age)
        } else {
            None
        }
    }

    pub fn age(&self) -> Option<i32> {
        self.age_on(Utc::now().date_naive())
    }

    /// Hours since the profile's last recorded activity.
    pub fn hours_since_active(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_active_at
            .map(|at| (now - at).num_minutes() as f64 / 60.0)
    }
}

/// Kind of a recorded interaction. Determines the event weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    View,
    Like,
    Message,
    ProfileClick,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::View => "view",
            ActionKind::Like => "like",
            ActionKind::Message => "message",
            ActionKind::ProfileClick => "profile_click",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(ActionKind::View),
            "like" => Some(ActionKind::Like),
            "message" => Some(ActionKind::Message),
            "profile_click" => Some(ActionKind::ProfileClick),
            _ => None,
        }
    }

    /// Event weight for this action. Views scale with dwell time: the
    /// 0.5–1.0 band saturates at a 30 second dwell.
    pub fn weight(&self, dwell_ms: Option<u64>) -> f32 {
        match self {
            ActionKind::View => {
                let dwell_secs = dwell_ms.unwrap_or(0) as f32 / 1000.0;
                0.5 + 0.5 * (dwell_secs / 30.0).clamp(0.0, 1.0)
            }
            ActionKind::Like => 2.0,
            ActionKind::Message => 3.0,
            ActionKind::ProfileClick => 1.5,
        }
    }
}

/// A single append-only interaction event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub action: ActionKind,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
}

/// Payload for recording a new interaction.
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub action: ActionKind,
    pub weight: f32,
}

/// Message sent by a user, as exposed by the interaction store. The body is
/// needed for messaging-style derivation; the recipient id feeds exclusions.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient_id: Uuid,
    pub body: String,
}

/// Which retrieval path produced the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecallSource {
    Primary,
    Discovery,
}

impl RecallSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecallSource::Primary => "primary",
            RecallSource::Discovery => "discovery",
        }
    }
}

/// Per-factor match score breakdown. Each factor is capped independently;
/// the total is always the factor sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub age: f32,
    pub location: f32,
    pub interest: f32,
    pub personality: f32,
    pub behavior: f32,
}

/// Scoring factors, in tie-breaking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Age,
    Location,
    Interest,
    Personality,
    Behavior,
}

impl FactorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::Age => "age",
            FactorKind::Location => "location",
            FactorKind::Interest => "interest",
            FactorKind::Personality => "personality",
            FactorKind::Behavior => "behavior",
        }
    }
}

impl MatchScore {
    pub fn total(&self) -> f32 {
        self.age + self.location + self.interest + self.personality + self.behavior
    }

    /// The factor contributing the most, ties resolved by declaration order.
    pub fn top_factor(&self) -> FactorKind {
        let factors = [
            (FactorKind::Age, self.age),
            (FactorKind::Location, self.location),
            (FactorKind::Interest, self.interest),
            (FactorKind::Personality, self.personality),
            (FactorKind::Behavior, self.behavior),
        ];
        let mut top = factors[0];
        for &candidate in &factors[1..] {
            if candidate.1 > top.1 {
                top = candidate;
            }
        }
        top.0
    }
}

/// Closed set of insight categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightKind {
    #[serde(rename = "mutual-interest-count")]
    MutualInterestCount,
    #[serde(rename = "mutual-interest-specific")]
    MutualInterestSpecific,
    #[serde(rename = "location-exact")]
    LocationExact,
    #[serde(rename = "age-exact")]
    AgeExact,
    #[serde(rename = "high-activity")]
    HighActivity,
    #[serde(rename = "discovery")]
    Discovery,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::MutualInterestCount => "mutual-interest-count",
            InsightKind::MutualInterestSpecific => "mutual-interest-specific",
            InsightKind::LocationExact => "location-exact",
            InsightKind::AgeExact => "age-exact",
            InsightKind::HighActivity => "high-activity",
            InsightKind::Discovery => "discovery",
        }
    }
}

/// A ranked, human-readable reason why a candidate was suggested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInsight {
    pub kind: InsightKind,
    pub text: String,
    pub weight: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub items: Option<Vec<String>>,
}

impl MatchInsight {
    pub fn new(kind: InsightKind, text: impl Into<String>, weight: f32) -> Self {
        Self {
            kind,
            text: text.into(),
            weight,
            count: None,
            items: None,
        }
    }
}

/// One ranked candidate as persisted in the cache: ids and scores only,
/// never full profile content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMatch {
    pub candidate_id: Uuid,
    pub total: f32,
    /// None on the discovery path, where the total is assigned rather than
    /// computed from factors.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub breakdown: Option<MatchScore>,
    pub insights: Vec<MatchInsight>,
}

/// Serialized cache payload for one user's ranked list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMatchList {
    pub entries: Vec<RankedMatch>,
    pub generated_at: DateTime<Utc>,
}

/// One item of the final feed returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct MatchItem {
    pub candidate: Profile,
    pub total: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<MatchScore>,
    pub insights: Vec<MatchInsight>,
}

impl MatchItem {
    /// The headline reason shown to the user.
    pub fn primary_insight(&self) -> Option<&MatchInsight> {
        self.insights.first()
    }

    /// Up to two supplementary tags after the headline.
    pub fn secondary_insights(&self) -> &[MatchInsight] {
        let end = self.insights.len().min(3);
        if end > 1 {
            &self.insights[1..end]
        } else {
            &[]
        }
    }
}

/// Result of a `get_matches` call.
#[derive(Debug, Clone, Serialize)]
pub struct MatchFeed {
    pub items: Vec<MatchItem>,
    pub total_count: usize,
}

impl MatchFeed {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}
