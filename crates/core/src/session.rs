//! Round-by-round state of a drill session.
//!
//! A [`Session`] owns the in-memory copy of the items in scope and walks each
//! round through prompt, answer and bookkeeping. Persisting an outcome is the
//! caller's job and must happen before the next prompt is requested.

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::model::{
    ChapterAttribution, EndReason, ItemKey, ItemRecord, Outcome, Scope, SessionReport,
};
use crate::scheduler::{Scheduler, SchedulerError, item_weight};
use crate::time::Deadline;

/// Inputs that end the session instead of answering.
pub const QUIT_TOKENS: [&str; 3] = ["exit", "q", "quit"];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum RoundError {
    #[error("no items in scope")]
    Empty,
    #[error("a prompt is already awaiting an answer")]
    AwaitingAnswer,
    #[error("no prompt is awaiting an answer")]
    NoPendingPrompt,
    #[error("session already finished")]
    Finished,
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// Which side of the pair is shown. Fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Show the target-language term, expect the source-language term.
    #[default]
    TargetToSource,
    /// Show the source-language term, expect the target-language term.
    SourceToTarget,
}

impl Direction {
    /// `(prompt, expected)` for `item` in this direction.
    #[must_use]
    pub fn orient<'a>(&self, item: &'a ItemRecord) -> (&'a str, &'a str) {
        match self {
            Direction::TargetToSource => (item.target_term(), item.source_term()),
            Direction::SourceToTarget => (item.source_term(), item.target_term()),
        }
    }
}

/// True for `exit`, `q` and `quit`, ignoring case and surrounding whitespace.
#[must_use]
pub fn is_quit_token(input: &str) -> bool {
    let input = input.trim();
    QUIT_TOKENS
        .iter()
        .any(|token| input.eq_ignore_ascii_case(token))
}

/// Case-insensitive comparison of the learner's input with the expected answer.
///
/// Empty or garbled input is simply incorrect.
#[must_use]
pub fn check_answer(input: &str, expected: &str) -> Outcome {
    let input = input.trim();
    let matches = input.to_lowercase() == expected.trim().to_lowercase();
    Outcome::from_correct(!input.is_empty() && matches)
}

//
// ─── ROUNDS ────────────────────────────────────────────────────────────────────
//

/// A sampled question waiting for the learner's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub index: usize,
    pub prompt: String,
    pub expected: String,
    pub weight: f64,
}

/// Result of a graded round. `key` identifies the record to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedRound {
    pub index: usize,
    pub key: ItemKey,
    pub outcome: Outcome,
    pub expected: String,
}

/// What happened to a submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerStep {
    /// A quit token; the round was abandoned without grading.
    Quit,
    Graded(GradedRound),
}

#[derive(Debug, Clone, PartialEq)]
enum RoundState {
    AwaitPrompt,
    AwaitAnswer(Prompt),
    Finished(EndReason),
}

/// Running totals for the end-of-session report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTotals {
    pub num_correct: u32,
    pub num_wrong: u32,
    pub correct: Vec<String>,
    pub incorrect: Vec<String>,
}

impl SessionTotals {
    fn record(&mut self, outcome: Outcome, answer: String) {
        match outcome {
            Outcome::Correct => {
                self.num_correct = self.num_correct.saturating_add(1);
                self.correct.push(answer);
            }
            Outcome::Incorrect => {
                self.num_wrong = self.num_wrong.saturating_add(1);
                self.incorrect.push(answer);
            }
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory drill session over one scope.
pub struct Session {
    scope: Scope,
    attribution: ChapterAttribution,
    items: Vec<ItemRecord>,
    direction: Direction,
    deadline: Deadline,
    scheduler: Scheduler,
    state: RoundState,
    totals: SessionTotals,
}

impl Session {
    /// Start a session over `items`, the records loaded for `scope`.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::Empty` if `items` is empty.
    pub fn new(
        scope: Scope,
        items: Vec<ItemRecord>,
        direction: Direction,
        deadline: Deadline,
    ) -> Result<Self, RoundError> {
        if items.is_empty() {
            return Err(RoundError::Empty);
        }

        Ok(Self {
            scope,
            attribution: ChapterAttribution::from_items(&items),
            items,
            direction,
            deadline,
            scheduler: Scheduler::new(),
            state: RoundState::AwaitPrompt,
            totals: SessionTotals::default(),
        })
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn attribution(&self) -> ChapterAttribution {
        self.attribution
    }

    #[must_use]
    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    #[must_use]
    pub fn totals(&self) -> &SessionTotals {
        &self.totals
    }

    /// Current weights, index-aligned with [`Session::items`].
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.scheduler.weights(&self.items)
    }

    /// True once the wall-clock deadline has passed. Only meaningful between rounds.
    #[must_use]
    pub fn deadline_reached(&self, now: DateTime<Utc>) -> bool {
        self.deadline.has_passed(now)
    }

    /// Sample the next item and move to awaiting an answer.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::AwaitingAnswer` if the previous prompt is unanswered
    /// and `RoundError::Finished` after the session ended.
    pub fn next_prompt<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&Prompt, RoundError> {
        match self.state {
            RoundState::AwaitPrompt => {}
            RoundState::AwaitAnswer(_) => return Err(RoundError::AwaitingAnswer),
            RoundState::Finished(_) => return Err(RoundError::Finished),
        }

        let index = self.scheduler.sample(&self.items, rng)?;
        let item = &self.items[index];
        let (prompt, expected) = self.direction.orient(item);
        self.state = RoundState::AwaitAnswer(Prompt {
            index,
            prompt: prompt.to_owned(),
            expected: expected.to_owned(),
            weight: item_weight(item),
        });

        match &self.state {
            RoundState::AwaitAnswer(prompt) => Ok(prompt),
            _ => Err(RoundError::NoPendingPrompt),
        }
    }

    /// Grade `input` against the pending prompt.
    ///
    /// A quit token finishes the session without touching any counter.
    /// Otherwise the in-memory counter and the session totals are updated and
    /// the returned [`GradedRound`] must be persisted before the next round.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::NoPendingPrompt` if no prompt is outstanding and
    /// `RoundError::Finished` after the session ended.
    pub fn answer(&mut self, input: &str) -> Result<AnswerStep, RoundError> {
        let prompt = match &self.state {
            RoundState::AwaitAnswer(prompt) => prompt.clone(),
            RoundState::AwaitPrompt => return Err(RoundError::NoPendingPrompt),
            RoundState::Finished(_) => return Err(RoundError::Finished),
        };

        if is_quit_token(input) {
            self.state = RoundState::Finished(EndReason::Quit);
            return Ok(AnswerStep::Quit);
        }

        let outcome = check_answer(input, &prompt.expected);
        let item = &mut self.items[prompt.index];
        item.record(outcome);
        let key = item.key().clone();

        self.totals.record(outcome, prompt.expected.clone());
        self.state = RoundState::AwaitPrompt;

        Ok(AnswerStep::Graded(GradedRound {
            index: prompt.index,
            key,
            outcome,
            expected: prompt.expected,
        }))
    }

    /// End the session and build its report.
    ///
    /// A session that was not ended by a quit token is reported as ending at
    /// the deadline. An unanswered prompt is dropped.
    #[must_use]
    pub fn finish(&mut self, ended_at: DateTime<Utc>) -> SessionReport {
        let ended_by = match self.state {
            RoundState::Finished(reason) => reason,
            _ => EndReason::Deadline,
        };
        self.state = RoundState::Finished(ended_by);

        SessionReport {
            scope: self.scope,
            chapter: self.attribution,
            time_limit_secs: self.deadline.limit().as_secs(),
            started_at: self.deadline.started_at(),
            ended_at,
            ended_by,
            num_correct: self.totals.num_correct,
            num_wrong: self.totals.num_wrong,
            correct: self.totals.correct.clone(),
            incorrect: self.totals.incorrect.clone(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
