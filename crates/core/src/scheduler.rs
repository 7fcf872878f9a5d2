use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use thiserror::Error;

use crate::model::ItemRecord;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("cannot sample from an empty scope")]
    EmptyScope,
    #[error("weight table rejected: {0}")]
    InvalidWeights(String),
}

//
// ─── WEIGHTING ─────────────────────────────────────────────────────────────────
//

/// Selection weight for an item with `correct` right and `incorrect` wrong answers.
///
/// `(1 + incorrect) / (1 + correct)`: an untouched item weighs 1, items missed
/// more often than answered weigh more than 1, and well-known items shrink
/// toward zero without ever reaching it.
///
/// # Examples
///
/// ```
/// # use drill_core::scheduler::weight;
/// assert_eq!(weight(0, 0), 1.0);
/// assert_eq!(weight(0, 5), 6.0);
/// assert_eq!(weight(3, 1), 0.5);
/// ```
#[must_use]
pub fn weight(correct: u32, incorrect: u32) -> f64 {
    (1.0 + f64::from(incorrect)) / (1.0 + f64::from(correct))
}

/// Weight of a stored item, from its current counters.
#[must_use]
pub fn item_weight(item: &ItemRecord) -> f64 {
    weight(item.correct_count(), item.incorrect_count())
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Weighted sampler over a session's items.
///
/// Every round draws one index from the full item set with probability
/// proportional to [`weight`]. Draws are independent, so the same item can
/// come up twice in a row; the distribution is recomputed from the latest
/// counters on every call.
///
/// # Examples
///
/// ```
/// # use drill_core::scheduler::Scheduler;
/// # use drill_core::model::{Chapter, ItemId, ItemKey, ItemRecord};
/// let chapter = Chapter::new(1).unwrap();
/// let items = vec![ItemRecord::new(
///     ItemId::new(1),
///     ItemKey::new(chapter, "gato", "cat").unwrap(),
/// )];
/// let index = Scheduler::new().sample(&items, &mut rand::rng())?;
/// assert_eq!(index, 0);
/// # Ok::<(), drill_core::scheduler::SchedulerError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Current weight of every item, index-aligned with `items`.
    #[must_use]
    pub fn weights(&self, items: &[ItemRecord]) -> Vec<f64> {
        items.iter().map(item_weight).collect()
    }

    /// Draw one index in `0..items.len()` proportionally to item weights.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::EmptyScope` when `items` is empty.
    /// Returns `SchedulerError::InvalidWeights` if the weight table cannot be
    /// turned into a distribution (not reachable with finite counters).
    pub fn sample<R: Rng + ?Sized>(
        &self,
        items: &[ItemRecord],
        rng: &mut R,
    ) -> Result<usize, SchedulerError> {
        if items.is_empty() {
            return Err(SchedulerError::EmptyScope);
        }

        let dist = WeightedIndex::new(self.weights(items))
            .map_err(|e| SchedulerError::InvalidWeights(e.to_string()))?;
        Ok(dist.sample(rng))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
