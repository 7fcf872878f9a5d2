use drill_core::model::{ItemKey, ItemRecord, Outcome, Scope};
use tracing::debug;

use super::SqliteRepository;
use super::mapping::{chapter_to_i64, counter_column, item_id_from_i64, map_item_row};
use crate::repository::{IncrementResult, PerformanceStore, StorageError};

fn connection(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl PerformanceStore for SqliteRepository {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.migrate()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn load(&self, scope: Scope) -> Result<Vec<ItemRecord>, StorageError> {
        let rows = match scope {
            Scope::All => {
                sqlx::query(
                    r"
                    SELECT id, chapter, english, spanish, num_correct, num_wrong
                    FROM player_stats
                    ORDER BY id ASC
                    ",
                )
                .fetch_all(&self.pool)
                .await
            }
            Scope::Chapter(chapter) => {
                sqlx::query(
                    r"
                    SELECT id, chapter, english, spanish, num_correct, num_wrong
                    FROM player_stats
                    WHERE chapter = ?1
                    ORDER BY id ASC
                    ",
                )
                .bind(chapter_to_i64(chapter))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(connection)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(map_item_row(&row)?);
        }
        debug!(%scope, count = items.len(), "loaded item records");
        Ok(items)
    }

    async fn create(&self, key: &ItemKey) -> Result<ItemRecord, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO player_stats (chapter, english, spanish, num_correct, num_wrong)
            VALUES (?1, ?2, ?3, 0, 0)
            ",
        )
        .bind(chapter_to_i64(key.chapter))
        .bind(key.target_term.as_str())
        .bind(key.source_term.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => connection(other),
        })?;

        let id = item_id_from_i64(res.last_insert_rowid())?;
        debug!(%id, chapter = %key.chapter, source = %key.source_term, "created item record");
        Ok(ItemRecord::new(id, key.clone()))
    }

    async fn increment(
        &self,
        key: &ItemKey,
        outcome: Outcome,
    ) -> Result<IncrementResult, StorageError> {
        let column = counter_column(outcome);
        // single statement: the read-modify-write happens inside SQLite
        let sql = format!(
            "UPDATE player_stats SET {column} = {column} + 1 \
             WHERE chapter = ?1 AND spanish = ?2 AND english = ?3"
        );

        let res = sqlx::query(&sql)
            .bind(chapter_to_i64(key.chapter))
            .bind(key.source_term.as_str())
            .bind(key.target_term.as_str())
            .execute(&self.pool)
            .await
            .map_err(connection)?;

        if res.rows_affected() == 0 {
            return Ok(IncrementResult::Missing);
        }
        debug!(chapter = %key.chapter, source = %key.source_term, ?outcome, "incremented counter");
        Ok(IncrementResult::Applied)
    }
}
