//! Candidate recall
//!
//! Builds the exclusion set, runs the primary filtered query, and falls back
//! to a small discovery pool when preferences are too narrow to match
//! anyone. The user is never handed an empty result while reasonable
//! profiles exist.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::db::{CandidateFilter, ProfileStore};
use crate::error::Result;
use crate::models::{InteractionEvent, Profile, RecallSource, SentMessage};

/// Recall layer over the profile store.
pub struct CandidateRecall {
    profiles: Arc<dyn ProfileStore>,
    pool_limit: i64,
    discovery_limit: i64,
}

/// A retrieved pool plus the path that produced it.
#[derive(Debug)]
pub struct RecallOutcome {
    pub candidates: Vec<Profile>,
    pub source: RecallSource,
}

/// Self plus every id already interacted with, liked, or messaged.
pub fn build_exclusions(
    user_id: Uuid,
    events: &[InteractionEvent],
    liked: &[Uuid],
    messages: &[SentMessage],
) -> Vec<Uuid> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    seen.insert(user_id);
    seen.extend(events.iter().map(|e| e.target_id));
    seen.extend(liked.iter().copied());
    seen.extend(messages.iter().map(|m| m.recipient_id));
    seen.into_iter().collect()
}

impl CandidateRecall {
    pub fn new(profiles: Arc<dyn ProfileStore>, config: &MatchingConfig) -> Self {
        Self {
            profiles,
            pool_limit: config.pool_limit,
            discovery_limit: config.discovery_limit,
        }
    }

    /// Fetch the candidate pool for `user`, honoring the exclusion set and
    /// gender filter, newest profiles first.
    pub async fn recall(&self, user: &Profile, exclude: Vec<Uuid>) -> Result<RecallOutcome> {
        let filter = CandidateFilter {
            exclude,
            genders: user.interested_in.clone(),
            limit: self.pool_limit,
        };

        let candidates = self.profiles.find_candidates(filter).await?;
        debug!(
            user_id = %user.id,
            candidate_count = candidates.len(),
            "Primary recall complete"
        );

        if !candidates.is_empty() {
            return Ok(RecallOutcome {
                candidates,
                source: RecallSource::Primary,
            });
        }

        // Preferences matched nobody: hand back a flat newest-first pool
        // excluding only the user themself.
        let discovery = self
            .profiles
            .find_discovery(user.id, self.discovery_limit)
            .await?;
        info!(
            user_id = %user.id,
            discovery_count = discovery.len(),
            "Primary recall empty, using discovery pool"
        );

        Ok(RecallOutcome {
            candidates: discovery,
            source: RecallSource::Discovery,
        })
    }
}
