pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

// Re-export matching engine components
pub use cache::{MatchCache, MatchCacheStore};
pub use db::{InteractionStore, ProfileStore};
pub use services::{BehaviorPattern, CandidateRecall, MatchingEngine, TraceMode};
