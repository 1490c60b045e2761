//! `kicklist`: history of kicks/drops, rotated weekly (spec §9B).

use super::models::KickRow;
use super::DbError;
use sqlx::SqlitePool;

#[allow(clippy::too_many_arguments)]
pub async fn record(
    pool: &SqlitePool,
    nick: &str,
    ip: &str,
    host: Option<&str>,
    share_size: Option<&str>,
    reason: Option<&str>,
    op: &str,
    is_drop: bool,
    now: i64,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO kicklist (nick, time, ip, host, share_size, reason, op, is_drop)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(nick)
    .bind(now)
    .bind(ip)
    .bind(host)
    .bind(share_size)
    .bind(reason)
    .bind(op)
    .bind(is_drop as i64)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recent_for_nick(pool: &SqlitePool, nick: &str, limit: i64) -> Result<Vec<KickRow>, DbError> {
    let rows = sqlx::query_as::<_, KickRow>(
        "SELECT nick, time, ip, host, share_size, reason, op, is_drop FROM kicklist \
         WHERE nick = ? ORDER BY time DESC LIMIT ?",
    )
    .bind(nick)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Drop rows older than the configured rotation window (spec §9B weekly
/// kick-history rotation, driven by the slow timer).
pub async fn rotate(pool: &SqlitePool, retention_days: i64, now: i64) -> Result<u64, DbError> {
    let cutoff = now - retention_days * 86_400;
    let result = sqlx::query("DELETE FROM kicklist WHERE time < ?").bind(cutoff).execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn record_then_fetch_recent() {
        let db = Database::in_memory_for_test().await;
        record(db.pool(), "alice", "127.0.0.1", None, None, Some("spam"), "root", false, 1_700_000_000)
            .await
            .unwrap();
        let rows = recent_for_nick(db.pool(), "alice", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].op, "root");
    }

    #[tokio::test]
    async fn rotate_prunes_old_rows() {
        let db = Database::in_memory_for_test().await;
        record(db.pool(), "alice", "127.0.0.1", None, None, None, "root", false, 1_000).await.unwrap();
        let removed = rotate(db.pool(), 7, 1_000_000).await.unwrap();
        assert_eq!(removed, 1);
    }
}
