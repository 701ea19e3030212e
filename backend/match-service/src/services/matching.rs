//! Matching orchestrator
//!
//! The one public entry point. Composes cache lookup, behavior aggregation,
//! candidate recall, scoring, insight generation, optional tracing, and the
//! write-through cache into `get_matches`, plus the `track_interaction`
//! companion that records an event and invalidates the cache. Calls are
//! stateless and independent; two concurrent misses for the same user both
//! recompute and the last write wins.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::behavior::{self, BehaviorPattern};
use super::insights::{self, InsightSignals};
use super::recall::{build_exclusions, CandidateRecall};
use super::scoring::{self, TargetStats};
use super::trace::{CandidateTrace, FeatureSnapshot, SessionTracer, TraceMode};
use crate::cache::MatchCacheStore;
use crate::config::MatchingConfig;
use crate::db::{InteractionStore, ProfileStore};
use crate::error::Result;
use crate::models::{
    ActionKind, CachedMatchList, InteractionEvent, MatchFeed, MatchItem, NewInteraction, Profile,
    RankedMatch, RecallSource,
};

/// Fixed total assigned to discovery-pool items, which bypass scoring
/// entirely: there is no preference signal to score against.
const DISCOVERY_SCORE: f32 = 60.0;

pub struct MatchingEngine {
    profiles: Arc<dyn ProfileStore>,
    interactions: Arc<dyn InteractionStore>,
    cache: Arc<dyn MatchCacheStore>,
    recall: CandidateRecall,
    config: MatchingConfig,
    trace_mode: TraceMode,
}

impl MatchingEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        interactions: Arc<dyn InteractionStore>,
        cache: Arc<dyn MatchCacheStore>,
        config: MatchingConfig,
    ) -> Self {
        Self::with_trace_mode(profiles, interactions, cache, config, TraceMode::from_env())
    }

    pub fn with_trace_mode(
        profiles: Arc<dyn ProfileStore>,
        interactions: Arc<dyn InteractionStore>,
        cache: Arc<dyn MatchCacheStore>,
        config: MatchingConfig,
        trace_mode: TraceMode,
    ) -> Self {
        let recall = CandidateRecall::new(Arc::clone(&profiles), &config);
        Self {
            profiles,
            interactions,
            cache,
            recall,
            config,
            trace_mode,
        }
    }

    /// Ranked, explained matches for `user_id`.
    pub async fn get_matches(&self, user_id: Uuid) -> Result<MatchFeed> {
        if let Some(feed) = self.read_through(user_id).await? {
            return Ok(feed);
        }

        let Some(user) = self.profiles.find_by_id(user_id).await? else {
            // Nothing to match against and nothing the caller can act on
            info!(user_id = %user_id, "Profile not found, returning empty feed");
            return Ok(MatchFeed::empty());
        };

        let now = Utc::now();

        // The three history collections feed both aggregation and exclusions
        let (events, liked_ids, messages) = futures::try_join!(
            self.interactions.find_by_user(user_id),
            self.interactions.find_likes_by_source(user_id),
            self.interactions.find_messages_by_sender(user_id),
        )?;

        let exclude = build_exclusions(user_id, &events, &liked_ids, &messages);

        // No data dependency between liked-profile resolution and recall
        let (liked_profiles, outcome) = futures::try_join!(
            self.profiles.find_by_ids(liked_ids),
            self.recall.recall(&user, exclude),
        )?;

        if outcome.source == RecallSource::Discovery {
            let entries: Vec<RankedMatch> = outcome
                .candidates
                .iter()
                .map(|candidate| RankedMatch {
                    candidate_id: candidate.id,
                    total: DISCOVERY_SCORE,
                    breakdown: None,
                    insights: vec![insights::discovery_insight()],
                })
                .collect();

            self.write_through(user_id, entries.clone()).await;
            return Ok(assemble_feed(entries, outcome.candidates));
        }

        let pattern =
            behavior::build_pattern(&user, &liked_profiles, &events, &messages, now.date_naive());
        let stats = scoring::target_stats(&events);

        let mut ranked = self.score_pool(&user, &outcome.candidates, &pattern, &stats, now);

        ranked.retain(|m| m.total >= self.config.score_floor);
        ranked.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            user_id = %user_id,
            ranked_count = ranked.len(),
            top_score = ranked.first().map(|m| m.total),
            "Ranking complete"
        );

        self.write_through(user_id, ranked.clone()).await;
        Ok(assemble_feed(ranked, outcome.candidates))
    }

    /// Record an interaction event and unconditionally drop the user's
    /// cached list. This is the system's only consistency mechanism.
    pub async fn track_interaction(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        action: ActionKind,
        dwell_ms: Option<u64>,
    ) -> Result<InteractionEvent> {
        let weight = action.weight(dwell_ms);
        let event = self
            .interactions
            .create(NewInteraction {
                user_id,
                target_id,
                action,
                weight,
            })
            .await?;

        match tokio::time::timeout(self.cache_deadline(), self.cache.delete(user_id)).await {
            Ok(Ok(())) => {}
            // A store that fails deletes also fails reads, which are treated
            // as misses, so a stale entry cannot outlive a broken store
            Ok(Err(e)) => warn!(user_id = %user_id, "Cache invalidation failed: {}", e),
            Err(_) => warn!(user_id = %user_id, "Cache invalidation timed out"),
        }

        Ok(event)
    }

    /// Score and explain every candidate in the pool. A malformed candidate
    /// degrades to factor fallbacks rather than aborting the rest.
    fn score_pool(
        &self,
        user: &Profile,
        candidates: &[Profile],
        pattern: &BehaviorPattern,
        stats: &HashMap<Uuid, TargetStats>,
        now: DateTime<Utc>,
    ) -> Vec<RankedMatch> {
        let today = now.date_naive();
        let mut tracer = SessionTracer::new(self.trace_mode, user.id);
        let mut ranked = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let mutual = scoring::mutual_interests(user, candidate);
            let breakdown = scoring::score_candidate(
                user,
                candidate,
                pattern,
                stats.get(&candidate.id),
                &mutual,
                today,
            );
            let total = breakdown.total();

            let signals = InsightSignals::derive(user, candidate, mutual, total, now);
            let insight_list = insights::generate(&signals);

            if tracer.is_enabled() {
                tracer.record(CandidateTrace {
                    candidate_id: candidate.id,
                    breakdown,
                    total,
                    top_factor: breakdown.top_factor(),
                    features: FeatureSnapshot {
                        age_diff: signals.age_diff,
                        in_preferred_age_range: candidate
                            .age_on(today)
                            .map(|age| pattern.prefers_age(age))
                            .unwrap_or(false),
                        mutual_interests: signals.mutual_interests.clone(),
                        distance_km: signals.distance_km,
                        same_city: signals.distance_km == 0.0,
                        verified: signals.verified,
                        interaction_count: stats.get(&candidate.id).map(|s| s.count).unwrap_or(0),
                    },
                    insight_kinds: insight_list.iter().map(|i| i.kind).collect(),
                    top_insight: insight_list.first().map(|i| i.text.clone()),
                });
            }

            ranked.push(RankedMatch {
                candidate_id: candidate.id,
                total,
                breakdown: Some(breakdown),
                insights: insight_list,
            });
        }

        tracer.finish();
        ranked
    }

    /// Cache read with rehydration. Transport errors, timeouts, stale
    /// entries, and corrupt payloads all degrade to a miss; only the live
    /// profile re-fetch can fail the request.
    async fn read_through(&self, user_id: Uuid) -> Result<Option<MatchFeed>> {
        let cached: CachedMatchList =
            match tokio::time::timeout(self.cache_deadline(), self.cache.get(user_id)).await {
                Ok(Ok(Some(cached))) => cached,
                Ok(Ok(None)) => return Ok(None),
                Ok(Err(e)) => {
                    warn!(user_id = %user_id, "Cache read failed, recomputing: {}", e);
                    return Ok(None);
                }
                Err(_) => {
                    warn!(user_id = %user_id, "Cache read timed out, recomputing");
                    return Ok(None);
                }
            };

        let age = Utc::now() - cached.generated_at;
        if age >= ChronoDuration::seconds(self.config.cache_ttl_secs as i64) {
            debug!(user_id = %user_id, "Cache entry expired, recomputing");
            return Ok(None);
        }

        // Scores and insights travel with the entry; profile content is
        // always re-fetched live so it can't go stale with the ranking
        let ids: Vec<Uuid> = cached.entries.iter().map(|e| e.candidate_id).collect();
        let profiles = self.profiles.find_by_ids(ids).await?;

        let feed = assemble_feed(cached.entries, profiles);
        debug!(user_id = %user_id, items = feed.total_count, "Served matches from cache");
        Ok(Some(feed))
    }

    /// Write-through. An unwritten entry only costs a future recomputation,
    /// so failures are logged and swallowed.
    async fn write_through(&self, user_id: Uuid, entries: Vec<RankedMatch>) {
        match tokio::time::timeout(self.cache_deadline(), self.cache.set(user_id, entries)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(user_id = %user_id, "Cache write failed: {}", e),
            Err(_) => warn!(user_id = %user_id, "Cache write timed out"),
        }
    }

    fn cache_deadline(&self) -> Duration {
        Duration::from_millis(self.config.cache_timeout_ms)
    }
}

/// Join ranked entries with their live profiles, preserving rank order.
/// Entries whose profile has vanished are dropped.
fn assemble_feed(entries: Vec<RankedMatch>, profiles: Vec<Profile>) -> MatchFeed {
    let mut by_id: HashMap<Uuid, Profile> =
        profiles.into_iter().map(|p| (p.id, p)).collect();

    let items: Vec<MatchItem> = entries
        .into_iter()
        .filter_map(|entry| {
            by_id.remove(&entry.candidate_id).map(|candidate| MatchItem {
                candidate,
                total: entry.total,
                breakdown: entry.breakdown,
                insights: entry.insights,
            })
        })
        .collect();

    MatchFeed {
        total_count: items.len(),
        items,
    }
}
