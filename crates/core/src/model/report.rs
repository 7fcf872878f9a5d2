use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::scope::{ChapterAttribution, Scope};

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The wall-clock deadline passed at a round boundary.
    Deadline,
    /// The learner typed a quit token.
    Quit,
}

/// End-of-session totals handed to the transcript sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub scope: Scope,
    pub chapter: ChapterAttribution,
    pub time_limit_secs: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub ended_by: EndReason,
    pub num_correct: u32,
    pub num_wrong: u32,
    pub correct: Vec<String>,
    pub incorrect: Vec<String>,
}

impl SessionReport {
    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.num_correct.saturating_add(self.num_wrong)
    }
}
