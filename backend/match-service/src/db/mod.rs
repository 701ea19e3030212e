mod interactions_repo;
mod profiles_repo;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{InteractionEvent, NewInteraction, Profile, SentMessage};

pub use interactions_repo::InteractionRepository;
pub use profiles_repo::ProfileRepository;

/// Filter for the primary candidate query.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    /// Ids that must not appear in the pool (self plus everyone already
    /// interacted with, liked, or messaged).
    pub exclude: Vec<Uuid>,
    /// Accepted candidate genders. Empty disables the gender filter.
    pub genders: Vec<String>,
    pub limit: i64,
}

/// Read access to user profiles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>>;
    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Profile>>;
    async fn find_candidates(&self, filter: CandidateFilter) -> Result<Vec<Profile>>;
    /// Flat newest-first pool excluding only the user themself.
    async fn find_discovery(&self, exclude_id: Uuid, limit: i64) -> Result<Vec<Profile>>;
}

/// Append-only access to interaction history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<InteractionEvent>>;
    async fn find_likes_by_source(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
    async fn find_messages_by_sender(&self, user_id: Uuid) -> Result<Vec<SentMessage>>;
    async fn create(&self, event: NewInteraction) -> Result<InteractionEvent>;
}
