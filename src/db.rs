use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('attachee', 'intern', 'staff', 'hr')),
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        date TEXT NOT NULL,
        checkin_time TEXT,
        checkout_time TEXT,
        status TEXT NOT NULL DEFAULT 'Present' CHECK (status IN ('Present', 'Absent', 'Late')),
        UNIQUE (user_id, date)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_user_role ON users(role)",
];

/// Opens the pool and creates the schema.
///
/// `sqlite::memory:` databases live only as long as their connection, so they
/// get exactly one connection that is never recycled.
pub async fn init_db(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid DATABASE_URL {}", database_url))?
        .foreign_keys(true);

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to create schema")?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    init_db("sqlite::memory:", 1)
        .await
        .expect("in-memory database")
}
