//! `triggers`: a persisted prefix-to-canned-reply table, distinct from
//! the console command dispatch table (spec §6.4 `!(add|mod|del)trigger`,
//! §9B `ctriggers.cpp`).

use super::DbError;
use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TriggerRow {
    pub prefix: String,
    pub reply: String,
    pub enable: i64,
}

pub async fn get(pool: &SqlitePool, prefix: &str) -> Result<Option<TriggerRow>, DbError> {
    let row = sqlx::query_as::<_, TriggerRow>("SELECT prefix, reply, enable FROM triggers WHERE prefix = ?")
        .bind(prefix)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<TriggerRow>, DbError> {
    let rows = sqlx::query_as::<_, TriggerRow>("SELECT prefix, reply, enable FROM triggers")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn upsert(pool: &SqlitePool, prefix: &str, reply: &str) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO triggers (prefix, reply, enable) VALUES (?, ?, 1) \
         ON CONFLICT(prefix) DO UPDATE SET reply = excluded.reply",
    )
    .bind(prefix)
    .bind(reply)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove(pool: &SqlitePool, prefix: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM triggers WHERE prefix = ?").bind(prefix).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn upsert_then_get() {
        let db = Database::in_memory_for_test().await;
        upsert(db.pool(), "!rules", "Read the rules at ...").await.unwrap();
        let row = get(db.pool(), "!rules").await.unwrap().unwrap();
        assert_eq!(row.reply, "Read the rules at ...");
    }

    #[tokio::test]
    async fn remove_deletes_row() {
        let db = Database::in_memory_for_test().await;
        upsert(db.pool(), "!rules", "x").await.unwrap();
        assert!(remove(db.pool(), "!rules").await.unwrap());
        assert!(get(db.pool(), "!rules").await.unwrap().is_none());
    }
}
