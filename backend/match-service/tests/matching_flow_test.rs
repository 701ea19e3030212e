//! Integration tests: full matching flow
//!
//! Drives the real engine end to end against in-memory store fakes:
//! recall + exclusions, scoring, insight ordering, the discovery fallback,
//! cache freshness, and invalidation through interaction tracking.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use match_service::cache::MatchCacheStore;
use match_service::config::MatchingConfig;
use match_service::db::{CandidateFilter, InteractionStore, ProfileStore};
use match_service::error::Result;
use match_service::models::{
    ActionKind, CachedMatchList, InteractionEvent, NewInteraction, Profile, RankedMatch,
    SentMessage,
};
use match_service::services::{MatchingEngine, TraceMode};

// ---- in-memory store fakes ----

#[derive(Default)]
struct InMemoryProfiles {
    profiles: Mutex<Vec<Profile>>,
}

impl InMemoryProfiles {
    fn insert(&self, profile: Profile) {
        self.profiles.lock().unwrap().push(profile);
    }

    fn newest_first(&self) -> Vec<Profile> {
        let mut all = self.profiles.lock().unwrap().clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Profile>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn find_candidates(&self, filter: CandidateFilter) -> Result<Vec<Profile>> {
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|p| !filter.exclude.contains(&p.id))
            .filter(|p| filter.genders.is_empty() || filter.genders.contains(&p.gender))
            .take(filter.limit as usize)
            .collect())
    }

    async fn find_discovery(&self, exclude_id: Uuid, limit: i64) -> Result<Vec<Profile>> {
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|p| p.id != exclude_id)
            .take(limit as usize)
            .collect())
    }
}

#[derive(Default)]
struct InMemoryInteractions {
    events: Mutex<Vec<InteractionEvent>>,
    messages: Mutex<HashMap<Uuid, Vec<SentMessage>>>,
}

#[async_trait]
impl InteractionStore for InMemoryInteractions {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<InteractionEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_likes_by_source(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.action == ActionKind::Like)
            .map(|e| e.target_id)
            .collect())
    }

    async fn find_messages_by_sender(&self, user_id: Uuid) -> Result<Vec<SentMessage>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, event: NewInteraction) -> Result<InteractionEvent> {
        let stored = InteractionEvent {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            target_id: event.target_id,
            action: event.action,
            weight: event.weight,
            created_at: Utc::now(),
        };
        self.events.lock().unwrap().push(stored.clone());
        Ok(stored)
    }
}

#[derive(Default)]
struct InMemoryCache {
    entries: Mutex<HashMap<Uuid, CachedMatchList>>,
}

impl InMemoryCache {
    fn contains(&self, user_id: Uuid) -> bool {
        self.entries.lock().unwrap().contains_key(&user_id)
    }

    fn backdate(&self, user_id: Uuid, generated_at: DateTime<Utc>) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(&user_id) {
            entry.generated_at = generated_at;
        }
    }
}

#[async_trait]
impl MatchCacheStore for InMemoryCache {
    async fn get(&self, user_id: Uuid) -> Result<Option<CachedMatchList>> {
        Ok(self.entries.lock().unwrap().get(&user_id).cloned())
    }

    async fn set(&self, user_id: Uuid, entries: Vec<RankedMatch>) -> Result<()> {
        self.entries.lock().unwrap().insert(
            user_id,
            CachedMatchList {
                entries,
                generated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<()> {
        self.entries.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

// ---- fixture helpers ----

struct Fixture {
    profiles: Arc<InMemoryProfiles>,
    interactions: Arc<InMemoryInteractions>,
    cache: Arc<InMemoryCache>,
    engine: MatchingEngine,
}

fn fixture() -> Fixture {
    let profiles = Arc::new(InMemoryProfiles::default());
    let interactions = Arc::new(InMemoryInteractions::default());
    let cache = Arc::new(InMemoryCache::default());

    let engine = MatchingEngine::with_trace_mode(
        Arc::clone(&profiles) as Arc<dyn ProfileStore>,
        Arc::clone(&interactions) as Arc<dyn InteractionStore>,
        Arc::clone(&cache) as Arc<dyn MatchCacheStore>,
        MatchingConfig::default(),
        TraceMode::Disabled,
    );

    Fixture {
        profiles,
        interactions,
        cache,
        engine,
    }
}

struct ProfileBuilder {
    profile: Profile,
}

fn profile(gender: &str) -> ProfileBuilder {
    ProfileBuilder {
        profile: Profile {
            id: Uuid::new_v4(),
            gender: gender.to_string(),
            interested_in: Vec::new(),
            date_of_birth: NaiveDate::from_ymd_opt(1995, 1, 15),
            city: None,
            interests: Vec::new(),
            bio: None,
            is_verified: false,
            last_active_at: None,
            created_at: Utc::now(),
        },
    }
}

impl ProfileBuilder {
    fn interested_in(mut self, genders: &[&str]) -> Self {
        self.profile.interested_in = genders.iter().map(|g| g.to_string()).collect();
        self
    }

    fn age(mut self, age: i32) -> Self {
        self.profile.date_of_birth = NaiveDate::from_ymd_opt(Utc::now().year() - age, 1, 1);
        self
    }

    fn city(mut self, city: &str) -> Self {
        self.profile.city = Some(city.to_string());
        self
    }

    fn interests(mut self, interests: &[&str]) -> Self {
        self.profile.interests = interests.iter().map(|i| i.to_string()).collect();
        self
    }

    fn active_hours_ago(mut self, hours: i64) -> Self {
        self.profile.last_active_at = Some(Utc::now() - Duration::hours(hours));
        self
    }

    fn created_minutes_ago(mut self, minutes: i64) -> Self {
        self.profile.created_at = Utc::now() - Duration::minutes(minutes);
        self
    }

    fn build(self) -> Profile {
        self.profile
    }
}

// ---- tests ----

#[tokio::test]
async fn zero_history_user_sees_all_matching_gender_profiles_except_self() {
    let fx = fixture();

    let user = profile("male").age(30).interested_in(&["female"]).build();
    let a = profile("female").age(28).created_minutes_ago(1).build();
    let b = profile("female").age(32).created_minutes_ago(2).build();
    let other_gender = profile("male").age(29).created_minutes_ago(3).build();

    fx.profiles.insert(user.clone());
    fx.profiles.insert(a.clone());
    fx.profiles.insert(b.clone());
    fx.profiles.insert(other_gender.clone());

    let feed = fx.engine.get_matches(user.id).await.unwrap();

    let ids: Vec<Uuid> = feed.items.iter().map(|i| i.candidate.id).collect();
    assert_eq!(feed.total_count, 2);
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&b.id));
    assert!(!ids.contains(&user.id));
    assert!(!ids.contains(&other_gender.id));
}

#[tokio::test]
async fn interacted_liked_and_messaged_targets_are_excluded() {
    let fx = fixture();

    let user = profile("male").age(30).interested_in(&["female"]).build();
    let liked = profile("female").age(28).build();
    let viewed = profile("female").age(29).build();
    let messaged = profile("female").age(31).build();
    let fresh = profile("female").age(30).build();

    for p in [&user, &liked, &viewed, &messaged, &fresh] {
        fx.profiles.insert((*p).clone());
    }

    fx.interactions
        .create(NewInteraction {
            user_id: user.id,
            target_id: liked.id,
            action: ActionKind::Like,
            weight: 2.0,
        })
        .await
        .unwrap();
    fx.interactions
        .create(NewInteraction {
            user_id: user.id,
            target_id: viewed.id,
            action: ActionKind::View,
            weight: 0.8,
        })
        .await
        .unwrap();
    fx.interactions
        .messages
        .lock()
        .unwrap()
        .entry(user.id)
        .or_default()
        .push(SentMessage {
            recipient_id: messaged.id,
            body: "hi there".to_string(),
        });

    let feed = fx.engine.get_matches(user.id).await.unwrap();

    let ids: Vec<Uuid> = feed.items.iter().map(|i| i.candidate.id).collect();
    assert_eq!(ids, vec![fresh.id]);
}

#[tokio::test]
async fn shared_interest_scenario_orders_insights_by_weight() {
    let fx = fixture();

    let user = profile("female")
        .age(30)
        .interested_in(&["male"])
        .city("Berlin")
        .interests(&["hiking", "tech"])
        .build();
    let candidate = profile("male")
        .age(33)
        .city("Berlin")
        .interests(&["Hiking", "Tech", "sailing"])
        .active_hours_ago(2)
        .build();

    fx.profiles.insert(user.clone());
    fx.profiles.insert(candidate.clone());

    let feed = fx.engine.get_matches(user.id).await.unwrap();
    assert_eq!(feed.total_count, 1);

    let texts: Vec<&str> = feed.items[0]
        .insights
        .iter()
        .map(|i| i.text.as_str())
        .collect();
    assert_eq!(
        texts,
        vec!["2 shared interests detected", "Within 5km radius", "Active today"]
    );

    // Weights descend with ties keeping generation order
    let weights: Vec<f32> = feed.items[0].insights.iter().map(|i| i.weight).collect();
    for pair in weights.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[tokio::test]
async fn score_breakdown_sums_and_respects_caps() {
    let fx = fixture();

    let user = profile("female")
        .age(30)
        .interested_in(&["male"])
        .city("Berlin")
        .interests(&["hiking", "tech", "wine"])
        .build();
    let candidate = profile("male")
        .age(30)
        .city("Berlin")
        .interests(&["hiking", "tech", "wine", "sailing"])
        .build();

    fx.profiles.insert(user.clone());
    fx.profiles.insert(candidate.clone());

    let feed = fx.engine.get_matches(user.id).await.unwrap();
    let item = &feed.items[0];
    let breakdown = item.breakdown.expect("primary path keeps the breakdown");

    assert!(breakdown.age <= 25.0);
    assert!(breakdown.location <= 20.0);
    assert!(breakdown.interest <= 25.0);
    assert!(breakdown.personality <= 15.0);
    assert!(breakdown.behavior <= 15.0);
    assert_eq!(item.total, breakdown.total());
    // 3 shared interests cap the interest factor
    assert_eq!(breakdown.interest, 25.0);
}

#[tokio::test]
async fn narrow_preferences_fall_back_to_discovery_pool() {
    let fx = fixture();

    let user = profile("male")
        .age(30)
        .interested_in(&["nonbinary"])
        .build();
    fx.profiles.insert(user.clone());

    for i in 0..14 {
        fx.profiles
            .insert(profile("female").age(25 + i).created_minutes_ago(i as i64).build());
    }

    let feed = fx.engine.get_matches(user.id).await.unwrap();

    assert_eq!(feed.total_count, 12);
    for item in &feed.items {
        assert_eq!(item.total, 60.0);
        assert!(item.breakdown.is_none());
        assert_eq!(item.insights.len(), 1);
        assert_eq!(item.insights[0].text, "Discover new people");
    }
}

#[tokio::test]
async fn fresh_cache_hit_returns_identical_ranking() {
    let fx = fixture();

    let user = profile("male").age(30).interested_in(&["female"]).build();
    fx.profiles.insert(user.clone());
    for i in 0..5 {
        fx.profiles.insert(
            profile("female")
                .age(26 + i)
                .city("Berlin")
                .created_minutes_ago(i as i64)
                .build(),
        );
    }

    let first = fx.engine.get_matches(user.id).await.unwrap();
    assert!(fx.cache.contains(user.id));

    // A profile added after the first computation must not appear while the
    // cached entry is fresh
    fx.profiles
        .insert(profile("female").age(27).city("Berlin").build());

    let second = fx.engine.get_matches(user.id).await.unwrap();

    let first_ranking: Vec<(Uuid, String)> = first
        .items
        .iter()
        .map(|i| (i.candidate.id, format!("{:.3}", i.total)))
        .collect();
    let second_ranking: Vec<(Uuid, String)> = second
        .items
        .iter()
        .map(|i| (i.candidate.id, format!("{:.3}", i.total)))
        .collect();
    assert_eq!(first_ranking, second_ranking);
}

#[tokio::test]
async fn expired_cache_entry_triggers_recompute() {
    let fx = fixture();

    let user = profile("male").age(30).interested_in(&["female"]).build();
    fx.profiles.insert(user.clone());
    fx.profiles.insert(profile("female").age(28).build());

    fx.engine.get_matches(user.id).await.unwrap();
    assert!(fx.cache.contains(user.id));

    // Age the entry past the 6h freshness window, then add a new profile
    fx.cache.backdate(user.id, Utc::now() - Duration::hours(7));
    let late_arrival = profile("female").age(29).created_minutes_ago(0).build();
    fx.profiles.insert(late_arrival.clone());

    let feed = fx.engine.get_matches(user.id).await.unwrap();
    let ids: Vec<Uuid> = feed.items.iter().map(|i| i.candidate.id).collect();
    assert!(ids.contains(&late_arrival.id));
}

#[tokio::test]
async fn tracking_an_interaction_invalidates_and_excludes() {
    let fx = fixture();

    let user = profile("male").age(30).interested_in(&["female"]).build();
    let a = profile("female").age(28).created_minutes_ago(1).build();
    let b = profile("female").age(31).created_minutes_ago(2).build();

    fx.profiles.insert(user.clone());
    fx.profiles.insert(a.clone());
    fx.profiles.insert(b.clone());

    let first = fx.engine.get_matches(user.id).await.unwrap();
    assert_eq!(first.total_count, 2);
    assert!(fx.cache.contains(user.id));

    // Liking A drops the cached list immediately, regardless of its TTL
    fx.engine
        .track_interaction(user.id, a.id, ActionKind::Like, None)
        .await
        .unwrap();
    assert!(!fx.cache.contains(user.id));

    // The recompute reflects the like: A is now excluded
    let second = fx.engine.get_matches(user.id).await.unwrap();
    let ids: Vec<Uuid> = second.items.iter().map(|i| i.candidate.id).collect();
    assert_eq!(ids, vec![b.id]);
}

#[tokio::test]
async fn missing_user_yields_empty_feed_not_error() {
    let fx = fixture();
    let feed = fx.engine.get_matches(Uuid::new_v4()).await.unwrap();
    assert_eq!(feed.total_count, 0);
    assert!(feed.items.is_empty());
}
