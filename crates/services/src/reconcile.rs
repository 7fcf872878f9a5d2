use std::collections::HashSet;

use drill_core::model::{ItemKey, ItemRecord, Scope};
use storage::repository::{PerformanceStore, StorageError};
use tracing::{debug, info};

use crate::error::SetupError;
use crate::vocabulary::ChapterVocabulary;

/// Records in scope after reconciliation, and how many were newly created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub items: Vec<ItemRecord>,
    pub created: usize,
}

/// Make sure every vocabulary pair in `scope` has exactly one stored record.
///
/// Missing pairs are created with zero counters; existing records are left
/// untouched. The scope is reloaded once after the batch, never per insert.
///
/// # Errors
///
/// Returns `SetupError` if the store cannot be read or written, or a
/// vocabulary term is blank.
pub async fn reconcile(
    store: &dyn PerformanceStore,
    scope: Scope,
    vocabulary: &[ChapterVocabulary],
) -> Result<Reconciled, SetupError> {
    let loaded = store.load(scope).await?;
    let mut known: HashSet<ItemKey> = loaded.iter().map(|item| item.key().clone()).collect();
    let mut created = 0_usize;
    // set when the store holds rows `loaded` does not, including rows another
    // process inserted between our load and insert
    let mut stale = false;

    for chapter in vocabulary.iter().filter(|c| scope.includes(c.chapter)) {
        for pair in &chapter.pairs {
            let key = ItemKey::new(chapter.chapter, pair.source.as_str(), pair.target.as_str())?;
            if known.contains(&key) {
                continue;
            }

            match store.create(&key).await {
                Ok(_) => created += 1,
                Err(StorageError::Conflict) => {
                    debug!(
                        chapter = %key.chapter,
                        source = %key.source_term,
                        "record already exists"
                    );
                }
                Err(e) => return Err(e.into()),
            }
            stale = true;
            known.insert(key);
        }
    }

    if !stale {
        return Ok(Reconciled {
            items: loaded,
            created,
        });
    }

    if created > 0 {
        info!(%scope, created, "registered new vocabulary");
    }
    let items = store.load(scope).await?;
    Ok(Reconciled { items, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drill_core::model::{Chapter, Outcome};
    use drill_core::vocab::TermPair;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::{IncrementResult, InMemoryRepository};

    /// Another writer registers the key just before our insert lands.
    #[derive(Default)]
    struct RacingStore {
        inner: InMemoryRepository,
        raced: AtomicBool,
    }

    #[async_trait]
    impl PerformanceStore for RacingStore {
        async fn ensure_schema(&self) -> Result<(), StorageError> {
            self.inner.ensure_schema().await
        }

        async fn load(&self, scope: Scope) -> Result<Vec<ItemRecord>, StorageError> {
            self.inner.load(scope).await
        }

        async fn create(&self, key: &ItemKey) -> Result<ItemRecord, StorageError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner.create(key).await?;
            }
            self.inner.create(key).await
        }

        async fn increment(
            &self,
            key: &ItemKey,
            outcome: Outcome,
        ) -> Result<IncrementResult, StorageError> {
            self.inner.increment(key, outcome).await
        }
    }

    fn chapter(n: u32, pairs: &[(&str, &str)]) -> ChapterVocabulary {
        ChapterVocabulary {
            chapter: Chapter::new(n).unwrap(),
            pairs: pairs.iter().map(|(s, t)| TermPair::new(*s, *t)).collect(),
        }
    }

    #[tokio::test]
    async fn creates_missing_records_with_zero_counters() {
        let repo = InMemoryRepository::new();
        let vocab = vec![chapter(1, &[("gato", "cat"), ("perro", "dog")])];

        let out = reconcile(&repo, Scope::All, &vocab).await.unwrap();
        assert_eq!(out.created, 2);
        assert_eq!(out.items.len(), 2);
        assert!(out.items.iter().all(|i| i.attempts() == 0));
    }

    #[tokio::test]
    async fn second_pass_is_idempotent() {
        let repo = InMemoryRepository::new();
        let vocab = vec![
            chapter(1, &[("gato", "cat"), ("perro", "dog")]),
            chapter(2, &[("casa", "house")]),
        ];

        let first = reconcile(&repo, Scope::All, &vocab).await.unwrap();
        let second = reconcile(&repo, Scope::All, &vocab).await.unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(first.items, second.items);
        assert_eq!(repo.load(Scope::All).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn preserves_existing_counters() {
        let repo = InMemoryRepository::new();
        let key = ItemKey::new(Chapter::new(1).unwrap(), "perro", "dog").unwrap();
        repo.insert_with_counts(key.clone(), 2, 5).unwrap();

        let vocab = vec![chapter(1, &[("gato", "cat"), ("perro", "dog")])];
        let out = reconcile(&repo, Scope::All, &vocab).await.unwrap();

        assert_eq!(out.created, 1);
        let perro = out.items.iter().find(|i| i.key() == &key).unwrap();
        assert_eq!(perro.correct_count(), 2);
        assert_eq!(perro.incorrect_count(), 5);
    }

    #[tokio::test]
    async fn same_pair_in_two_chapters_is_tracked_separately() {
        let repo = InMemoryRepository::new();
        let vocab = vec![chapter(1, &[("gato", "cat")]), chapter(2, &[("gato", "cat")])];

        let out = reconcile(&repo, Scope::All, &vocab).await.unwrap();
        assert_eq!(out.items.len(), 2);

        let ch1 = ItemKey::new(Chapter::new(1).unwrap(), "gato", "cat").unwrap();
        repo.increment(&ch1, Outcome::Incorrect).await.unwrap();
        let ch2 = repo.load(Scope::from_number(2)).await.unwrap();
        assert_eq!(ch2[0].attempts(), 0);
    }

    #[tokio::test]
    async fn ignores_chapters_outside_scope() {
        let repo = InMemoryRepository::new();
        let vocab = vec![chapter(1, &[("gato", "cat")]), chapter(2, &[("perro", "dog")])];

        let out = reconcile(&repo, Scope::from_number(2), &vocab).await.unwrap();
        assert_eq!(out.created, 1);
        assert_eq!(repo.load(Scope::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_calls_never_exceed_vocabulary_size() {
        let repo = InMemoryRepository::new();
        let vocab = vec![
            chapter(1, &[("gato", "cat"), ("perro", "dog"), ("casa", "house")]),
            chapter(2, &[("libro", "book")]),
        ];

        for _ in 0..5 {
            reconcile(&repo, Scope::All, &vocab).await.unwrap();
            reconcile(&repo, Scope::from_number(1), &vocab).await.unwrap();
        }
        assert_eq!(repo.load(Scope::All).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn concurrent_registration_is_reloaded() {
        let store = RacingStore::default();
        let vocab = vec![chapter(1, &[("gato", "cat")])];

        let out = reconcile(&store, Scope::All, &vocab).await.unwrap();

        assert_eq!(out.created, 0);
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].source_term(), "gato");
        assert_eq!(store.inner.load(Scope::All).await.unwrap().len(), 1);
    }
}
