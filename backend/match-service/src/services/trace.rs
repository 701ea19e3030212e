//! Per-candidate explainability traces
//!
//! Captures how each candidate's score and headline insight came to be, for
//! offline debugging only. Gated twice: the `MATCH_TRACE` toggle selects the
//! output mode, and release builds compile the whole thing down to disabled
//! no matter what the environment says, so the flag alone can never switch
//! this on in production.

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::env;
use tracing::info;
use uuid::Uuid;

use crate::models::{FactorKind, InsightKind, MatchScore};

static TRACE_MODE: OnceCell<TraceMode> = OnceCell::new();

/// Output mode for the trace recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    Disabled,
    /// Human-readable line per candidate plus a summary line.
    Text,
    /// One structured JSON session document for offline tooling.
    Json,
}

impl TraceMode {
    /// Resolve the mode from `MATCH_TRACE`, once per process.
    pub fn from_env() -> Self {
        *TRACE_MODE.get_or_init(|| {
            if !cfg!(debug_assertions) {
                return TraceMode::Disabled;
            }
            match env::var("MATCH_TRACE")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str()
            {
                "text" => TraceMode::Text,
                "json" => TraceMode::Json,
                _ => TraceMode::Disabled,
            }
        })
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, TraceMode::Disabled)
    }
}

/// Snapshot of the raw features behind one candidate's score.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSnapshot {
    pub age_diff: Option<i32>,
    pub in_preferred_age_range: bool,
    pub mutual_interests: Vec<String>,
    pub distance_km: f32,
    pub same_city: bool,
    pub verified: bool,
    pub interaction_count: u32,
}

/// Diagnostic record for one scored candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateTrace {
    pub candidate_id: Uuid,
    pub breakdown: MatchScore,
    pub total: f32,
    pub top_factor: FactorKind,
    pub features: FeatureSnapshot,
    pub insight_kinds: Vec<InsightKind>,
    pub top_insight: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopCandidate {
    pub candidate_id: Uuid,
    pub total: f32,
}

/// Aggregate statistics over one orchestration call.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub candidate_count: usize,
    pub avg_score: f32,
    pub min_score: f32,
    pub max_score: f32,
    pub top: Vec<TopCandidate>,
}

#[derive(Serialize)]
struct SessionDocument<'a> {
    user_id: Uuid,
    summary: &'a SessionSummary,
    candidates: &'a [CandidateTrace],
}

/// Collects candidate traces over one call and emits them on `finish`.
/// Observes scoring output without affecting it; lives only for the call.
pub struct SessionTracer {
    mode: TraceMode,
    user_id: Uuid,
    entries: Vec<CandidateTrace>,
}

impl SessionTracer {
    pub fn new(mode: TraceMode, user_id: Uuid) -> Self {
        Self {
            mode,
            user_id,
            entries: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode.is_enabled()
    }

    pub fn record(&mut self, entry: CandidateTrace) {
        if self.is_enabled() {
            self.entries.push(entry);
        }
    }

    pub fn summarize(&self) -> SessionSummary {
        let totals: Vec<f32> = self.entries.iter().map(|e| e.total).collect();
        let count = totals.len();

        let (avg, min, max) = if count == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f32 = totals.iter().sum();
            let min = totals.iter().copied().fold(f32::INFINITY, f32::min);
            let max = totals.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            (sum / count as f32, min, max)
        };

        let mut ranked: Vec<TopCandidate> = self
            .entries
            .iter()
            .map(|e| TopCandidate {
                candidate_id: e.candidate_id,
                total: e.total,
            })
            .collect();
        ranked.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(3);

        SessionSummary {
            candidate_count: count,
            avg_score: round1(avg),
            min_score: round1(min),
            max_score: round1(max),
            top: ranked,
        }
    }

    /// Emit the session through `tracing` in the configured mode.
    pub fn finish(self) {
        match self.mode {
            TraceMode::Disabled => {}
            TraceMode::Text => {
                for entry in &self.entries {
                    info!(
                        target: "match_trace",
                        candidate = %entry.candidate_id,
                        total = entry.total,
                        age = entry.breakdown.age,
                        location = entry.breakdown.location,
                        interest = entry.breakdown.interest,
                        personality = entry.breakdown.personality,
                        behavior = entry.breakdown.behavior,
                        top_factor = entry.top_factor.as_str(),
                        reason = entry.top_insight.as_deref().unwrap_or("-"),
                        "candidate scored"
                    );
                }
                let summary = self.summarize();
                info!(
                    target: "match_trace",
                    user_id = %self.user_id,
                    candidates = summary.candidate_count,
                    avg = summary.avg_score,
                    min = summary.min_score,
                    max = summary.max_score,
                    "session summary"
                );
            }
            TraceMode::Json => {
                let summary = self.summarize();
                let doc = SessionDocument {
                    user_id: self.user_id,
                    summary: &summary,
                    candidates: &self.entries,
                };
                match serde_json::to_string(&doc) {
                    Ok(json) => info!(target: "match_trace", "{}", json),
                    Err(e) => info!(target: "match_trace", "trace serialization failed: {}", e),
                }
            }
        }
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
