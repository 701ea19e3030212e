/// Match API Handlers
///
/// HTTP endpoints for ranked matches and interaction tracking. Thin layer:
/// a validated user id comes in, the engine does the rest.
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ActionKind, MatchItem, MatchScore, Profile};
use crate::services::MatchingEngine;

/// Handler state for the matching engine
pub struct MatchHandlerState {
    pub engine: Arc<MatchingEngine>,
}

/// Query parameters for GET /matches
#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    /// Number of matches to return (default: 20, max: 100)
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Candidate fields exposed over the API. Date of birth stays internal;
/// callers get the derived age.
#[derive(Debug, Serialize)]
pub struct CandidateResponse {
    pub id: Uuid,
    pub age: Option<i32>,
    pub city: Option<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
}

impl From<&Profile> for CandidateResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            age: profile.age(),
            city: profile.city.clone(),
            interests: profile.interests.clone(),
            bio: profile.bio.clone(),
            is_verified: profile.is_verified,
        }
    }
}

/// One ranked match in the response
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub candidate: CandidateResponse,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<MatchScore>,
    /// Headline reason, if any signal fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Up to two supplementary tags
    pub tags: Vec<String>,
}

impl From<&MatchItem> for MatchResponse {
    fn from(item: &MatchItem) -> Self {
        Self {
            candidate: CandidateResponse::from(&item.candidate),
            score: item.total,
            breakdown: item.breakdown,
            reason: item.primary_insight().map(|i| i.text.clone()),
            tags: item
                .secondary_insights()
                .iter()
                .map(|i| i.text.clone())
                .collect(),
        }
    }
}

/// Matches response
#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchResponse>,
    pub count: usize,
    pub total_count: usize,
}

/// Request body for POST /interactions
#[derive(Debug, Deserialize)]
pub struct TrackInteractionRequest {
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub action: ActionKind,
    /// Dwell time in milliseconds, only meaningful for views
    pub dwell_ms: Option<u64>,
}

/// GET /api/v1/matches/{user_id}
/// Ranked, explained match recommendations for a user
#[get("/api/v1/matches/{user_id}")]
pub async fn get_matches(
    path: web::Path<Uuid>,
    query: web::Query<MatchQuery>,
    state: web::Data<MatchHandlerState>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let limit = query.limit.clamp(1, 100);

    debug!("Getting matches for user: {}, limit: {}", user_id, limit);

    let feed = state.engine.get_matches(user_id).await?;

    let matches: Vec<MatchResponse> = feed.items.iter().take(limit).map(MatchResponse::from).collect();

    Ok(HttpResponse::Ok().json(MatchesResponse {
        count: matches.len(),
        total_count: feed.total_count,
        matches,
    }))
}

/// POST /api/v1/interactions
/// Record an interaction and invalidate the user's cached matches
#[post("/api/v1/interactions")]
pub async fn track_interaction(
    body: web::Json<TrackInteractionRequest>,
    state: web::Data<MatchHandlerState>,
) -> Result<HttpResponse> {
    debug!(
        "Tracking {} from {} to {}",
        body.action.as_str(),
        body.user_id,
        body.target_id
    );

    let event = state
        .engine
        .track_interaction(body.user_id, body.target_id, body.action, body.dwell_ms)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "recorded",
        "event_id": event.id,
    })))
}
