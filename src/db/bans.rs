//! Durable long bans: ten matcher kinds sharing one table via sentinel
//! values (spec §4.5, §6.3 `banlist`/`unbanlist`).

use super::models::{BanKind, BanRow};
use super::DbError;
use sqlx::SqlitePool;

const SENTINEL_NICKBAN: &str = "_nickban_";
const SENTINEL_IPBAN: &str = "_ipban_";
const SENTINEL_RANGEBAN: &str = "_rangeban_";
const SENTINEL_HOST1BAN: &str = "_host1ban_";
const SENTINEL_HOST2BAN: &str = "_host2ban_";
const SENTINEL_HOST3BAN: &str = "_host3ban_";
const SENTINEL_HOSTR1BAN: &str = "_hostr1ban_";
const SENTINEL_SHAREBAN: &str = "_shareban_";
const SENTINEL_PREFIXBAN: &str = "_prefixban_";

/// Everything a ban check needs about the connecting client. Fields the
/// caller cannot produce (no resolved hostname, unparseable IP) are
/// `None`, and the matchers that need them are skipped (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct BanSubject<'a> {
    pub nick: Option<&'a str>,
    pub ip: Option<&'a str>,
    pub ip_numeric: Option<u32>,
    pub host: Option<&'a str>,
    pub share: Option<u64>,
}

fn host_suffix(host: &str, labels: usize) -> Option<String> {
    let parts: Vec<&str> = host.rsplitn(labels + 1, '.').collect();
    if parts.len() <= labels {
        return None;
    }
    let mut suffix: Vec<&str> = parts[..labels].to_vec();
    suffix.reverse();
    Some(format!(".{}", suffix.join(".")))
}

fn host_prefix_label(host: &str) -> Option<&str> {
    host.split('.').next()
}

/// Create a new ban row for one of the ten matcher kinds.
#[allow(clippy::too_many_arguments)]
pub async fn add_ban(
    pool: &SqlitePool,
    kind: BanKind,
    value: &str,
    range_fr: Option<i64>,
    range_to: Option<i64>,
    reason: &str,
    op: &str,
    share: Option<&str>,
    expires_at: i64,
) -> Result<(), DbError> {
    let now = chrono::Utc::now().timestamp();
    let (ip, nick) = match kind {
        BanKind::Nick => (SENTINEL_NICKBAN.to_string(), value.to_string()),
        BanKind::Ip => (value.to_string(), SENTINEL_IPBAN.to_string()),
        BanKind::NickIp => {
            let mut parts = value.splitn(2, ' ');
            let n = parts.next().unwrap_or_default().to_string();
            let i = parts.next().unwrap_or_default().to_string();
            (i, n)
        }
        BanKind::Range => (String::new(), SENTINEL_RANGEBAN.to_string()),
        BanKind::Host1 => (SENTINEL_HOST1BAN.to_string(), value.to_string()),
        BanKind::Host2 => (SENTINEL_HOST2BAN.to_string(), value.to_string()),
        BanKind::Host3 => (SENTINEL_HOST3BAN.to_string(), value.to_string()),
        BanKind::HostR1 => (SENTINEL_HOSTR1BAN.to_string(), value.to_string()),
        BanKind::Share => (SENTINEL_SHAREBAN.to_string(), value.to_string()),
        BanKind::Prefix => (SENTINEL_PREFIXBAN.to_string(), value.to_string()),
    };

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO banlist
            (ip, nick, ban_type, host, range_fr, range_to, date_start, date_limit,
             last_hit, nick_op, reason, note_op, note_usr, share_size)
        VALUES (?, ?, ?, NULL, ?, ?, ?, ?, 0, ?, ?, NULL, NULL, ?)
        "#,
    )
    .bind(&ip)
    .bind(&nick)
    .bind(kind.as_i64())
    .bind(range_fr)
    .bind(range_to)
    .bind(now)
    .bind(expires_at)
    .bind(op)
    .bind(reason)
    .bind(share)
    .execute(pool)
    .await?;
    Ok(())
}

/// Compose the ten-matcher `OR` query described in spec §4.5 and return
/// the row with the latest `date_limit` (the rule that wins ties when
/// several bans apply), skipping matchers whose subject field is
/// unavailable. Expired rows are treated as non-matches but not pruned
/// here (pruning is the slow timer's job, spec §9B).
pub async fn check_ban(pool: &SqlitePool, subject: &BanSubject<'_>) -> Result<Option<BanRow>, DbError> {
    let now = chrono::Utc::now().timestamp();
    let mut clauses: Vec<String> = Vec::new();

    if let Some(nick) = subject.nick {
        clauses.push(format!("(ip = '{}' AND nick = '{}')", SENTINEL_NICKBAN, escape(nick)));
        clauses.push(format!("(ip = '{}' AND ? LIKE nick || '%')", SENTINEL_PREFIXBAN));
    }
    if let Some(share) = subject.share {
        clauses.push(format!("(ip = '{}' AND nick = '{}')", SENTINEL_SHAREBAN, escape(&share.to_string())));
    }
    if let Some(ip) = subject.ip {
        clauses.push(format!("(nick = '{}' AND ip = '{}')", SENTINEL_IPBAN, escape(ip)));
    }
    if let (Some(nick), Some(ip)) = (subject.nick, subject.ip) {
        clauses.push(format!(
            "(ban_type = {} AND (nick = '{}' OR ip = '{}'))",
            BanKind::NickIp.as_i64(),
            escape(nick),
            escape(ip)
        ));
    }
    if let Some(num) = subject.ip_numeric {
        clauses.push(format!(
            "(nick = '{}' AND range_fr <= {num} AND range_to >= {num})",
            SENTINEL_RANGEBAN
        ));
    }
    if let Some(host) = subject.host {
        if let Some(s1) = host_suffix(host, 1) {
            clauses.push(format!("(ip = '{}' AND nick = '{}')", SENTINEL_HOST1BAN, escape(&s1)));
        }
        if let Some(s2) = host_suffix(host, 2) {
            clauses.push(format!("(ip = '{}' AND nick = '{}')", SENTINEL_HOST2BAN, escape(&s2)));
        }
        if let Some(s3) = host_suffix(host, 3) {
            clauses.push(format!("(ip = '{}' AND nick = '{}')", SENTINEL_HOST3BAN, escape(&s3)));
        }
        if let Some(label) = host_prefix_label(host) {
            clauses.push(format!("(ip = '{}' AND nick = '{}')", SENTINEL_HOSTR1BAN, escape(label)));
        }
    }

    if clauses.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "SELECT ip, nick, ban_type, host, range_fr, range_to, date_start, date_limit, last_hit, nick_op, reason, note_op, note_usr, share_size \
         FROM banlist WHERE ({}) ORDER BY date_limit DESC",
        clauses.join(" OR ")
    );
    let mut query = sqlx::query_as::<_, BanRow>(&sql);
    if subject.nick.is_some() {
        query = query.bind(subject.nick.unwrap_or_default());
    }
    let rows = query.fetch_all(pool).await?;

    let hit = rows.into_iter().find(|r| !r.is_expired(now));
    if let Some(ref row) = hit {
        touch_last_hit(pool, &row.ip, &row.nick, now).await?;
    }
    Ok(hit)
}

async fn touch_last_hit(pool: &SqlitePool, ip: &str, nick: &str, now: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE banlist SET last_hit = ? WHERE ip = ? AND nick = ?")
        .bind(now)
        .bind(ip)
        .bind(nick)
        .execute(pool)
        .await?;
    Ok(())
}

/// Move a ban row to `unbanlist` (spec §8 "Ban(n); Unban(n)" idempotence law).
pub async fn unban(pool: &SqlitePool, ip: &str, nick: &str, unban_op: &str, unban_reason: &str) -> Result<bool, DbError> {
    let now = chrono::Utc::now().timestamp();
    let row = sqlx::query_as::<_, BanRow>(
        "SELECT ip, nick, ban_type, host, range_fr, range_to, date_start, date_limit, last_hit, nick_op, reason, note_op, note_usr, share_size \
         FROM banlist WHERE ip = ? AND nick = ?",
    )
    .bind(ip)
    .bind(nick)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else { return Ok(false) };

    sqlx::query(
        r#"
        INSERT INTO unbanlist
            (ip, nick, ban_type, host, range_fr, range_to, date_start, date_limit,
             last_hit, nick_op, reason, note_op, note_usr, share_size, date_unban, unban_op, unban_reason)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.ip)
    .bind(&row.nick)
    .bind(row.ban_type)
    .bind(&row.host)
    .bind(row.range_fr)
    .bind(row.range_to)
    .bind(row.date_start)
    .bind(row.date_limit)
    .bind(row.last_hit)
    .bind(&row.nick_op)
    .bind(&row.reason)
    .bind(&row.note_op)
    .bind(&row.note_usr)
    .bind(&row.share_size)
    .bind(now)
    .bind(unban_op)
    .bind(unban_reason)
    .execute(pool)
    .await?;

    sqlx::query("DELETE FROM banlist WHERE ip = ? AND nick = ?")
        .bind(ip)
        .bind(nick)
        .execute(pool)
        .await?;
    Ok(true)
}

pub async fn list_bans(pool: &SqlitePool) -> Result<Vec<BanRow>, DbError> {
    let rows = sqlx::query_as::<_, BanRow>(
        "SELECT ip, nick, ban_type, host, range_fr, range_to, date_start, date_limit, last_hit, nick_op, reason, note_op, note_usr, share_size FROM banlist",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Prune rows past `date_limit` (slow timer job, spec §9B: lazy expiry,
/// not eager deletion at match time).
pub async fn prune_expired(pool: &SqlitePool) -> Result<u64, DbError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("DELETE FROM banlist WHERE date_limit != 0 AND date_limit <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Prune `unbanlist` rows older than the configured retention (spec §9B).
pub async fn prune_unban_history(pool: &SqlitePool, retention_days: i64) -> Result<u64, DbError> {
    let cutoff = chrono::Utc::now().timestamp() - retention_days * 86_400;
    let result = sqlx::query("DELETE FROM unbanlist WHERE date_unban < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn nick_ban_matches_after_insert() {
        let db = Database::in_memory_for_test().await;
        add_ban(db.pool(), BanKind::Nick, "mallory", None, None, "spam", "root", None, 0).await.unwrap();
        let subject = BanSubject { nick: Some("mallory"), ..Default::default() };
        let hit = check_ban(db.pool(), &subject).await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn unban_moves_row_to_history() {
        let db = Database::in_memory_for_test().await;
        add_ban(db.pool(), BanKind::Nick, "mallory", None, None, "spam", "root", None, 0).await.unwrap();
        assert!(unban(db.pool(), "_nickban_", "mallory", "root", "appeal granted").await.unwrap());
        let subject = BanSubject { nick: Some("mallory"), ..Default::default() };
        assert!(check_ban(db.pool(), &subject).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn range_ban_matches_numeric_ip() {
        let db = Database::in_memory_for_test().await;
        add_ban(db.pool(), BanKind::Range, "", Some(100), Some(200), "range", "root", None, 0).await.unwrap();
        let subject = BanSubject { ip_numeric: Some(150), ..Default::default() };
        assert!(check_ban(db.pool(), &subject).await.unwrap().is_some());
        let subject2 = BanSubject { ip_numeric: Some(500), ..Default::default() };
        assert!(check_ban(db.pool(), &subject2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn host1_matches_domain_suffix() {
        let db = Database::in_memory_for_test().await;
        add_ban(db.pool(), BanKind::Host1, ".example.com", None, None, "host", "root", None, 0).await.unwrap();
        let subject = BanSubject { host: Some("evil.host.example.com"), ..Default::default() };
        assert!(check_ban(db.pool(), &subject).await.unwrap().is_some());
    }
}
