use drill_core::model::{Chapter, ItemId, ItemKey, ItemRecord, Outcome};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn item_id_from_i64(v: i64) -> Result<ItemId, StorageError> {
    u64::try_from(v)
        .map(ItemId::new)
        .map_err(|_| StorageError::Serialization("item id sign overflow".into()))
}

pub(crate) fn chapter_from_i64(v: i64) -> Result<Chapter, StorageError> {
    Chapter::new(u32_from_i64("chapter", v)?)
        .ok_or_else(|| StorageError::Serialization(format!("invalid chapter: {v}")))
}

pub(crate) fn chapter_to_i64(chapter: Chapter) -> i64 {
    i64::from(chapter.number())
}

/// Column bumped by an outcome.
pub(crate) fn counter_column(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Correct => "num_correct",
        Outcome::Incorrect => "num_wrong",
    }
}

pub(crate) fn map_item_row(row: &sqlx::sqlite::SqliteRow) -> Result<ItemRecord, StorageError> {
    let id = item_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let chapter = chapter_from_i64(row.try_get::<i64, _>("chapter").map_err(ser)?)?;
    let source: String = row.try_get("spanish").map_err(ser)?;
    let target: String = row.try_get("english").map_err(ser)?;
    let key = ItemKey::new(chapter, source, target).map_err(ser)?;

    let correct: i64 = row.try_get("num_correct").map_err(ser)?;
    let wrong: i64 = row.try_get("num_wrong").map_err(ser)?;
    let correct = u32_from_i64("num_correct", correct)?;
    let wrong = u32_from_i64("num_wrong", wrong)?;

    Ok(ItemRecord::from_persisted(id, key, correct, wrong))
}
