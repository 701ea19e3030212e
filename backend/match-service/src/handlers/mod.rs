#[path = "health.rs"]
mod health_route;
mod matches;

pub use health_route::health;
pub use matches::{get_matches, track_interaction, MatchHandlerState};
