use std::fmt::Write;
use std::sync::Arc;

use drill_core::model::{ItemRecord, Scope};
use drill_core::scheduler::item_weight;
use serde::Serialize;
use storage::repository::{PerformanceStore, StorageError};

/// Rows per printed batch.
pub const STATS_BATCH_SIZE: usize = 50;

/// Performance of a single item, as shown in the statistics report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStats {
    pub chapter: u32,
    pub source: String,
    pub target: String,
    pub correct: u32,
    pub wrong: u32,
    pub weight: f64,
}

impl From<&ItemRecord> for ItemStats {
    fn from(item: &ItemRecord) -> Self {
        Self {
            chapter: item.chapter().number(),
            source: item.source_term().to_owned(),
            target: item.target_term().to_owned(),
            correct: item.correct_count(),
            wrong: item.incorrect_count(),
            weight: item_weight(item),
        }
    }
}

/// Read-only view over stored performance records.
#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn PerformanceStore>,
}

impl StatsService {
    #[must_use]
    pub fn new(store: Arc<dyn PerformanceStore>) -> Self {
        Self { store }
    }

    /// Stats for every stored item in `scope`, in store order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub async fn item_stats(&self, scope: Scope) -> Result<Vec<ItemStats>, StorageError> {
        self.store.ensure_schema().await?;
        let items = self.store.load(scope).await?;
        Ok(items.iter().map(ItemStats::from).collect())
    }
}

/// Render one batch as a fixed-width table. `offset` is the 0-based index of
/// the batch's first row in the full listing.
#[must_use]
pub fn format_batch(batch: &[ItemStats], offset: usize, total: usize) -> String {
    let mut out = String::new();
    let end = offset + batch.len();
    let _ = writeln!(out, "Vocabulary performance: words {}-{end} of {total}", offset + 1);
    let _ = writeln!(
        out,
        "{:>3}  {:<24} {:<24} {:>7} {:>7} {:>7}",
        "ch", "source", "target", "correct", "wrong", "weight"
    );
    for row in batch {
        let _ = writeln!(
            out,
            "{:>3}  {:<24} {:<24} {:>7} {:>7} {:>7.3}",
            row.chapter, row.source, row.target, row.correct, row.wrong, row.weight
        );
    }
    out
}
