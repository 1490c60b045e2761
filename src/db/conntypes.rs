//! `conn_types`: named tag-validation profiles operators assign to
//! client identifiers (spec §4.7, §3 "Connection-type record").

use super::models::ConnTypeRow;
use super::DbError;
use sqlx::SqlitePool;

pub async fn get(pool: &SqlitePool, identifier: &str) -> Result<Option<ConnTypeRow>, DbError> {
    let row = sqlx::query_as::<_, ConnTypeRow>(
        "SELECT identifier, description, tag_min_slots, tag_max_slots, tag_min_limit, tag_min_ls_ratio \
         FROM conn_types WHERE identifier = ?",
    )
    .bind(identifier)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<ConnTypeRow>, DbError> {
    let rows = sqlx::query_as::<_, ConnTypeRow>(
        "SELECT identifier, description, tag_min_slots, tag_max_slots, tag_min_limit, tag_min_ls_ratio FROM conn_types",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn upsert(pool: &SqlitePool, row: &ConnTypeRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO conn_types (identifier, description, tag_min_slots, tag_max_slots, tag_min_limit, tag_min_ls_ratio)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(identifier) DO UPDATE SET
            description = excluded.description, tag_min_slots = excluded.tag_min_slots,
            tag_max_slots = excluded.tag_max_slots, tag_min_limit = excluded.tag_min_limit,
            tag_min_ls_ratio = excluded.tag_min_ls_ratio
        "#,
    )
    .bind(&row.identifier)
    .bind(&row.description)
    .bind(row.tag_min_slots)
    .bind(row.tag_max_slots)
    .bind(row.tag_min_limit)
    .bind(row.tag_min_ls_ratio)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove(pool: &SqlitePool, identifier: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM conn_types WHERE identifier = ?")
        .bind(identifier)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn upsert_then_get() {
        let db = Database::in_memory_for_test().await;
        let row = ConnTypeRow {
            identifier: "dsl".into(),
            description: "DSL".into(),
            tag_min_slots: 1,
            tag_max_slots: 10,
            tag_min_limit: 10.0,
            tag_min_ls_ratio: 0.1,
        };
        upsert(db.pool(), &row).await.unwrap();
        let fetched = get(db.pool(), "dsl").await.unwrap().unwrap();
        assert_eq!(fetched.description, "DSL");
    }
}
