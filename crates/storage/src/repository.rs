use async_trait::async_trait;
use drill_core::model::{ItemId, ItemKey, ItemRecord, Outcome, Scope};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Whether an increment hit a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementResult {
    Applied,
    /// No record matched the key. The in-memory scope and the store have
    /// diverged; callers log this and carry on.
    Missing,
}

/// Durable per-item performance counters.
///
/// Every method is a single atomic unit: a failure leaves previously
/// committed state untouched.
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    /// Create the backing structure if absent. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the schema cannot be created.
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// All records in `scope`, ordered by id. An empty result is valid.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn load(&self, scope: Scope) -> Result<Vec<ItemRecord>, StorageError>;

    /// Insert a record for `key` with both counters at zero.
    ///
    /// Callers check for an existing record first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a record with the same key exists,
    /// or other storage errors.
    async fn create(&self, key: &ItemKey) -> Result<ItemRecord, StorageError>;

    /// Bump the counter selected by `outcome` for the record matching `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the update cannot be executed. A missing
    /// record is reported as `IncrementResult::Missing`, not as an error.
    async fn increment(
        &self,
        key: &ItemKey,
        outcome: Outcome,
    ) -> Result<IncrementResult, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    items: Vec<ItemRecord>,
}

/// Simple in-memory store implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record with explicit counters, bypassing `create`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the key already exists.
    pub fn insert_with_counts(
        &self,
        key: ItemKey,
        correct: u32,
        incorrect: u32,
    ) -> Result<ItemRecord, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.items.iter().any(|item| item.key() == &key) {
            return Err(StorageError::Conflict);
        }
        guard.next_id += 1;
        let record =
            ItemRecord::from_persisted(ItemId::new(guard.next_id), key, correct, incorrect);
        guard.items.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl PerformanceStore for InMemoryRepository {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load(&self, scope: Scope) -> Result<Vec<ItemRecord>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .items
            .iter()
            .filter(|item| scope.includes(item.chapter()))
            .cloned()
            .collect())
    }

    async fn create(&self, key: &ItemKey) -> Result<ItemRecord, StorageError> {
        self.insert_with_counts(key.clone(), 0, 0)
    }

    async fn increment(
        &self,
        key: &ItemKey,
        outcome: Outcome,
    ) -> Result<IncrementResult, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.items.iter_mut().find(|item| item.key() == key) {
            Some(item) => {
                item.record(outcome);
                Ok(IncrementResult::Applied)
            }
            None => Ok(IncrementResult::Missing),
        }
    }
}

/// Store handle passed to services, behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn PerformanceStore>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::Chapter;

    fn key(chapter: u32, source: &str, target: &str) -> ItemKey {
        ItemKey::new(Chapter::new(chapter).unwrap(), source, target).unwrap()
    }

    #[tokio::test]
    async fn create_starts_at_zero_and_assigns_ids() {
        let repo = InMemoryRepository::new();
        let first = repo.create(&key(1, "gato", "cat")).await.unwrap();
        let second = repo.create(&key(1, "perro", "dog")).await.unwrap();

        assert_eq!(first.attempts(), 0);
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_key() {
        let repo = InMemoryRepository::new();
        repo.create(&key(1, "gato", "cat")).await.unwrap();
        let err = repo.create(&key(1, "gato", "cat")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        // same pair in another chapter is a separate record
        repo.create(&key(2, "gato", "cat")).await.unwrap();
    }

    #[tokio::test]
    async fn load_filters_by_scope() {
        let repo = InMemoryRepository::new();
        repo.create(&key(1, "gato", "cat")).await.unwrap();
        repo.create(&key(2, "perro", "dog")).await.unwrap();

        assert_eq!(repo.load(Scope::All).await.unwrap().len(), 2);
        let ch2 = repo.load(Scope::from_number(2)).await.unwrap();
        assert_eq!(ch2.len(), 1);
        assert_eq!(ch2[0].source_term(), "perro");
        assert!(repo.load(Scope::from_number(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn increment_reports_missing_record() {
        let repo = InMemoryRepository::new();
        repo.create(&key(1, "gato", "cat")).await.unwrap();

        let hit = repo
            .increment(&key(1, "gato", "cat"), Outcome::Incorrect)
            .await
            .unwrap();
        let miss = repo
            .increment(&key(1, "gato", "dog"), Outcome::Correct)
            .await
            .unwrap();

        assert_eq!(hit, IncrementResult::Applied);
        assert_eq!(miss, IncrementResult::Missing);
        let items = repo.load(Scope::All).await.unwrap();
        assert_eq!(items[0].incorrect_count(), 1);
        assert_eq!(items[0].correct_count(), 0);
    }
}
