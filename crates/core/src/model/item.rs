use thiserror::Error;

use crate::model::ids::{Chapter, ItemId};
use crate::model::outcome::Outcome;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("source term cannot be empty")]
    EmptySource,
    #[error("target term cannot be empty")]
    EmptyTarget,
}

//
// ─── NATURAL KEY ───────────────────────────────────────────────────────────────
//

/// Natural key of an item record: one vocabulary pair within one chapter.
///
/// The same pair in two chapters yields two distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub chapter: Chapter,
    pub source_term: String,
    pub target_term: String,
}

impl ItemKey {
    /// Build a key, rejecting blank terms.
    ///
    /// # Errors
    ///
    /// Returns `ItemError` if either term is empty after trimming.
    pub fn new(
        chapter: Chapter,
        source_term: impl Into<String>,
        target_term: impl Into<String>,
    ) -> Result<Self, ItemError> {
        let source_term = source_term.into();
        let target_term = target_term.into();
        if source_term.trim().is_empty() {
            return Err(ItemError::EmptySource);
        }
        if target_term.trim().is_empty() {
            return Err(ItemError::EmptyTarget);
        }
        Ok(Self {
            chapter,
            source_term,
            target_term,
        })
    }
}

//
// ─── ITEM RECORD ───────────────────────────────────────────────────────────────
//

/// Correct/incorrect history for one vocabulary pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    id: ItemId,
    key: ItemKey,
    correct_count: u32,
    incorrect_count: u32,
}

impl ItemRecord {
    /// A freshly created record with both counters at zero.
    #[must_use]
    pub fn new(id: ItemId, key: ItemKey) -> Self {
        Self::from_persisted(id, key, 0, 0)
    }

    /// Rehydrate a record from storage.
    #[must_use]
    pub fn from_persisted(
        id: ItemId,
        key: ItemKey,
        correct_count: u32,
        incorrect_count: u32,
    ) -> Self {
        Self {
            id,
            key,
            correct_count,
            incorrect_count,
        }
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    #[must_use]
    pub fn chapter(&self) -> Chapter {
        self.key.chapter
    }

    #[must_use]
    pub fn source_term(&self) -> &str {
        &self.key.source_term
    }

    #[must_use]
    pub fn target_term(&self) -> &str {
        &self.key.target_term
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.incorrect_count
    }

    /// Total number of graded answers for this item.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        u64::from(self.correct_count) + u64::from(self.incorrect_count)
    }

    /// Bump the counter matching `outcome`. Counters never decrease.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Correct => self.correct_count = self.correct_count.saturating_add(1),
            Outcome::Incorrect => self.incorrect_count = self.incorrect_count.saturating_add(1),
        }
    }
}
