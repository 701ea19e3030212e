pub mod behavior;
pub mod insights;
pub mod matching;
pub mod recall;
pub mod scoring;
pub mod trace;

pub use behavior::{BehaviorPattern, MessagingStyle};
pub use matching::MatchingEngine;
pub use recall::CandidateRecall;
pub use trace::{SessionTracer, TraceMode};
