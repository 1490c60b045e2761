//! `registration`: nick ownership, password hash, class, and flags
//! (spec §3 "Registration record").

use super::models::{CryptMethod, RegistrationRow};
use super::DbError;
use md5::{Digest, Md5};
use sqlx::SqlitePool;
use std::fmt::Write as _;

/// Hex-MD5 the way the wire protocol's `$MyPass` challenge expects
/// (spec §4.3 login sequence).
pub fn hash_password(plain: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(plain.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

pub fn verify_password(row: &RegistrationRow, plain: &str) -> bool {
    match CryptMethod::from_i64(row.pwd_type) {
        CryptMethod::HexMd5 => row.pwd.as_deref() == Some(hash_password(plain).as_str()),
        CryptMethod::None | CryptMethod::UnixCrypt => false,
    }
}

pub async fn get(pool: &SqlitePool, nick: &str) -> Result<Option<RegistrationRow>, DbError> {
    let row = sqlx::query_as::<_, RegistrationRow>(
        "SELECT nick, pwd, pwd_type, class, enabled, flags, notes_op, notes_usr, regged_on, \
         last_login, last_error, last_logout, login_count, error_count, auth_ip, alt_ip, fake_ip \
         FROM registration WHERE nick = ?",
    )
    .bind(nick)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn register(pool: &SqlitePool, nick: &str, plain_password: &str, class: i64, now: i64) -> Result<(), DbError> {
    let hashed = hash_password(plain_password);
    sqlx::query(
        r#"
        INSERT INTO registration (nick, pwd, pwd_type, class, enabled, flags, regged_on)
        VALUES (?, ?, ?, ?, 1, 0, ?)
        "#,
    )
    .bind(nick)
    .bind(&hashed)
    .bind(CryptMethod::HexMd5.as_i64())
    .bind(class)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unregister(pool: &SqlitePool, nick: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM registration WHERE nick = ?").bind(nick).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_class(pool: &SqlitePool, nick: &str, class: i64) -> Result<bool, DbError> {
    let result = sqlx::query("UPDATE registration SET class = ? WHERE nick = ?")
        .bind(class)
        .bind(nick)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record a successful login, bumping `login_count`/`last_login` and
/// the remembered connection-info columns used for `$WhoIP` (spec §4.9).
pub async fn record_login(pool: &SqlitePool, nick: &str, ip: &str, now: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE registration SET last_login = ?, login_count = login_count + 1, auth_ip = ? WHERE nick = ?",
    )
    .bind(now)
    .bind(ip)
    .bind(nick)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn record_bad_password(pool: &SqlitePool, nick: &str, now: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE registration SET last_error = ?, error_count = error_count + 1 WHERE nick = ?")
        .bind(now)
        .bind(nick)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn record_logout(pool: &SqlitePool, nick: &str, now: i64) -> Result<(), DbError> {
    sqlx::query("UPDATE registration SET last_logout = ? WHERE nick = ?")
        .bind(now)
        .bind(nick)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn register_then_verify_password() {
        let db = Database::in_memory_for_test().await;
        register(db.pool(), "alice", "hunter2", 1, 1_700_000_000).await.unwrap();
        let row = get(db.pool(), "alice").await.unwrap().unwrap();
        assert!(verify_password(&row, "hunter2"));
        assert!(!verify_password(&row, "wrong"));
    }

    #[tokio::test]
    async fn unregister_removes_row() {
        let db = Database::in_memory_for_test().await;
        register(db.pool(), "alice", "hunter2", 1, 1_700_000_000).await.unwrap();
        assert!(unregister(db.pool(), "alice").await.unwrap());
        assert!(get(db.pool(), "alice").await.unwrap().is_none());
    }
}
