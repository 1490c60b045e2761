//! `client_list`: known client tag identifiers and per-client version
//! bans (spec §4.7, §3 "Client record").

use super::models::ClientRow;
use super::DbError;
use sqlx::SqlitePool;

pub async fn get(pool: &SqlitePool, name: &str) -> Result<Option<ClientRow>, DbError> {
    let row = sqlx::query_as::<_, ClientRow>(
        "SELECT name, tag_id, min_version, max_version, min_ver_use, ban, enable FROM client_list WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<ClientRow>, DbError> {
    let rows = sqlx::query_as::<_, ClientRow>(
        "SELECT name, tag_id, min_version, max_version, min_ver_use, ban, enable FROM client_list",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn upsert(pool: &SqlitePool, row: &ClientRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO client_list (name, tag_id, min_version, max_version, min_ver_use, ban, enable)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            tag_id = excluded.tag_id, min_version = excluded.min_version,
            max_version = excluded.max_version, min_ver_use = excluded.min_ver_use,
            ban = excluded.ban, enable = excluded.enable
        "#,
    )
    .bind(&row.name)
    .bind(&row.tag_id)
    .bind(row.min_version)
    .bind(row.max_version)
    .bind(row.min_ver_use)
    .bind(row.ban)
    .bind(row.enable)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove(pool: &SqlitePool, name: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM client_list WHERE name = ?").bind(name).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn banned_client_is_findable_by_tag_id() {
        let db = Database::in_memory_for_test().await;
        let row = ClientRow {
            name: "BadClient".into(),
            tag_id: "BAD".into(),
            min_version: 0.0,
            max_version: 99.0,
            min_ver_use: 0.0,
            ban: 1,
            enable: 1,
        };
        upsert(db.pool(), &row).await.unwrap();
        let fetched = get(db.pool(), "BadClient").await.unwrap().unwrap();
        assert_eq!(fetched.ban, 1);
    }
}
