//! `temp_rights`: per-nick penalty quotas loaded into a live `User.rights`
//! at login time (spec §3 "Penalty record", §9B).

use super::models::PenaltyRow;
use super::DbError;
use sqlx::SqlitePool;

pub async fn get(pool: &SqlitePool, nick: &str) -> Result<Option<PenaltyRow>, DbError> {
    let row = sqlx::query_as::<_, PenaltyRow>(
        "SELECT nick, op, since, st_chat, st_search, st_ctm, st_pm, st_kick, st_share0, st_reg, st_opchat \
         FROM temp_rights WHERE nick = ?",
    )
    .bind(nick)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn set(pool: &SqlitePool, row: &PenaltyRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO temp_rights (nick, op, since, st_chat, st_search, st_ctm, st_pm, st_kick, st_share0, st_reg, st_opchat)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(nick) DO UPDATE SET
            op = excluded.op, since = excluded.since, st_chat = excluded.st_chat,
            st_search = excluded.st_search, st_ctm = excluded.st_ctm, st_pm = excluded.st_pm,
            st_kick = excluded.st_kick, st_share0 = excluded.st_share0, st_reg = excluded.st_reg,
            st_opchat = excluded.st_opchat
        "#,
    )
    .bind(&row.nick)
    .bind(&row.op)
    .bind(row.since)
    .bind(row.st_chat)
    .bind(row.st_search)
    .bind(row.st_ctm)
    .bind(row.st_pm)
    .bind(row.st_kick)
    .bind(row.st_share0)
    .bind(row.st_reg)
    .bind(row.st_opchat)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn clear(pool: &SqlitePool, nick: &str) -> Result<(), DbError> {
    sqlx::query("DELETE FROM temp_rights WHERE nick = ?").bind(nick).execute(pool).await?;
    Ok(())
}

/// Drop rows whose every deadline has elapsed (slow timer job, spec §9B).
pub async fn prune_expired(pool: &SqlitePool, now: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM temp_rights WHERE st_chat <= ? AND st_search <= ? AND st_ctm <= ? AND st_pm <= ? \
         AND st_kick <= ? AND st_share0 <= ? AND st_reg <= ? AND st_opchat <= ?",
    )
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let db = Database::in_memory_for_test().await;
        let row = PenaltyRow { nick: "alice".into(), st_chat: 123456, ..Default::default() };
        set(db.pool(), &row).await.unwrap();
        let fetched = get(db.pool(), "alice").await.unwrap().unwrap();
        assert_eq!(fetched.st_chat, 123456);
    }
}
