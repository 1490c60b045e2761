//! Persistent storage: one `SqlitePool` shared by every sub-table
//! accessor, migrated incrementally at startup the way the teacher's
//! `db::Database` does (pragma-driven `CREATE TABLE IF NOT EXISTS`,
//! no external migration files).

pub mod bans;
pub mod clients;
pub mod conntypes;
pub mod kicks;
pub mod models;
pub mod penalties;
pub mod redirects;
pub mod registrations;
pub mod setup;
pub mod triggers;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(String),
}

/// Handle to the hub's SQLite store. Cheap to clone (wraps a pool).
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(8).connect_with(options).await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Shared-cache in-memory database, used by unit/integration tests
    /// so every connection in the pool sees the same schema and rows.
    pub async fn in_memory_for_test() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("in-memory sqlite pool");
        let db = Database { pool };
        db.run_migrations().await.expect("migrate in-memory db");
        db
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS banlist (
                ip TEXT NOT NULL,
                nick TEXT NOT NULL,
                ban_type INTEGER NOT NULL,
                host TEXT,
                range_fr INTEGER,
                range_to INTEGER,
                date_start INTEGER NOT NULL,
                date_limit INTEGER NOT NULL,
                last_hit INTEGER NOT NULL DEFAULT 0,
                nick_op TEXT NOT NULL,
                reason TEXT,
                note_op TEXT,
                note_usr TEXT,
                share_size TEXT,
                PRIMARY KEY (ip, nick)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS unbanlist (
                ip TEXT NOT NULL,
                nick TEXT NOT NULL,
                ban_type INTEGER NOT NULL,
                host TEXT,
                range_fr INTEGER,
                range_to INTEGER,
                date_start INTEGER NOT NULL,
                date_limit INTEGER NOT NULL,
                last_hit INTEGER NOT NULL DEFAULT 0,
                nick_op TEXT NOT NULL,
                reason TEXT,
                note_op TEXT,
                note_usr TEXT,
                share_size TEXT,
                date_unban INTEGER NOT NULL,
                unban_op TEXT NOT NULL,
                unban_reason TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kicklist (
                nick TEXT NOT NULL,
                time INTEGER NOT NULL,
                ip TEXT NOT NULL,
                host TEXT,
                share_size TEXT,
                reason TEXT,
                op TEXT NOT NULL,
                is_drop INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS temp_rights (
                nick TEXT PRIMARY KEY,
                op TEXT,
                since INTEGER NOT NULL,
                st_chat INTEGER NOT NULL DEFAULT 0,
                st_search INTEGER NOT NULL DEFAULT 0,
                st_ctm INTEGER NOT NULL DEFAULT 0,
                st_pm INTEGER NOT NULL DEFAULT 0,
                st_kick INTEGER NOT NULL DEFAULT 0,
                st_share0 INTEGER NOT NULL DEFAULT 0,
                st_reg INTEGER NOT NULL DEFAULT 0,
                st_opchat INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS registration (
                nick TEXT PRIMARY KEY,
                pwd TEXT,
                pwd_type INTEGER NOT NULL DEFAULT 0,
                class INTEGER NOT NULL DEFAULT 0,
                enabled INTEGER NOT NULL DEFAULT 1,
                flags INTEGER NOT NULL DEFAULT 0,
                notes_op TEXT,
                notes_usr TEXT,
                regged_on INTEGER NOT NULL,
                last_login INTEGER NOT NULL DEFAULT 0,
                last_error INTEGER NOT NULL DEFAULT 0,
                last_logout INTEGER NOT NULL DEFAULT 0,
                login_count INTEGER NOT NULL DEFAULT 0,
                error_count INTEGER NOT NULL DEFAULT 0,
                auth_ip TEXT,
                alt_ip TEXT,
                fake_ip TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conn_types (
                identifier TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                tag_min_slots INTEGER NOT NULL DEFAULT 0,
                tag_max_slots INTEGER NOT NULL DEFAULT 0,
                tag_min_limit REAL NOT NULL DEFAULT 0,
                tag_min_ls_ratio REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS client_list (
                name TEXT PRIMARY KEY,
                tag_id TEXT NOT NULL,
                min_version REAL NOT NULL DEFAULT 0,
                max_version REAL NOT NULL DEFAULT 0,
                min_ver_use REAL NOT NULL DEFAULT 0,
                ban INTEGER NOT NULL DEFAULT 0,
                enable INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS custom_redirects (
                address TEXT PRIMARY KEY,
                flag INTEGER NOT NULL DEFAULT 0,
                start INTEGER NOT NULL DEFAULT 0,
                stop INTEGER NOT NULL DEFAULT 0,
                country TEXT,
                secure INTEGER NOT NULL DEFAULT 0,
                share INTEGER NOT NULL DEFAULT 0,
                enable INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS setup_list (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Console-command `!(add|mod|del)trigger`/`!lsttrigger` (spec §6.4);
        // the distilled spec names the commands but not the record they
        // manage, resolved from `ctriggers.cpp` (spec §9B).
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS triggers (
                prefix TEXT PRIMARY KEY,
                reply TEXT NOT NULL,
                enable INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = Database::in_memory_for_test().await;
        db.run_migrations().await.expect("re-running migrations must be safe");
    }
}
