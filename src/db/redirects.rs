//! `custom_redirects`: operator-managed redirect targets layered on top
//! of the static `[redirects]` config table (spec §6.3, §6.2).

use super::models::RedirectRow;
use super::DbError;
use sqlx::SqlitePool;

pub async fn list_enabled(pool: &SqlitePool, now: i64) -> Result<Vec<RedirectRow>, DbError> {
    let rows = sqlx::query_as::<_, RedirectRow>(
        "SELECT address, flag, start, stop, country, secure, share, enable FROM custom_redirects \
         WHERE enable != 0 AND (start = 0 OR start <= ?) AND (stop = 0 OR stop >= ?)",
    )
    .bind(now)
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn upsert(pool: &SqlitePool, row: &RedirectRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO custom_redirects (address, flag, start, stop, country, secure, share, enable)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(address) DO UPDATE SET
            flag = excluded.flag, start = excluded.start, stop = excluded.stop,
            country = excluded.country, secure = excluded.secure, share = excluded.share,
            enable = excluded.enable
        "#,
    )
    .bind(&row.address)
    .bind(row.flag)
    .bind(row.start)
    .bind(row.stop)
    .bind(&row.country)
    .bind(row.secure)
    .bind(row.share)
    .bind(row.enable)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove(pool: &SqlitePool, address: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM custom_redirects WHERE address = ?")
        .bind(address)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn disabled_redirect_is_excluded() {
        let db = Database::in_memory_for_test().await;
        let row = RedirectRow {
            address: "dchub://other.example".into(),
            flag: 0,
            start: 0,
            stop: 0,
            country: None,
            secure: 0,
            share: 0,
            enable: 0,
        };
        upsert(db.pool(), &row).await.unwrap();
        assert!(list_enabled(db.pool(), 1_700_000_000).await.unwrap().is_empty());
    }
}
