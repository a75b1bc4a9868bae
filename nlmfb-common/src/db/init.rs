//! Database initialization
//!
//! Creates the database file and every table on first run. All statements
//! are `CREATE TABLE IF NOT EXISTS`, so reopening an existing database is
//! safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the experiment database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table used by the experiment service
///
/// Split out from [`init_database`] so tests can build the schema on an
/// in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // sqlx enables foreign_keys on every sqlite connection it opens
    create_participants_table(pool).await?;
    create_critical_trials_table(pool).await?;
    create_attention_check_trials_table(pool).await?;
    create_admins_table(pool).await?;
    Ok(())
}

/// Single-connection in-memory database with the schema applied
///
/// Every connection to `sqlite::memory:` is a separate database, so the
/// pool is capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn create_participants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ip_address TEXT NOT NULL,
            worker_id TEXT NOT NULL DEFAULT '',
            assignment_id TEXT NOT NULL DEFAULT '',
            get_args TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT '',
            key VARCHAR(80) NOT NULL,
            study VARCHAR(80) NOT NULL,
            ua_header TEXT NOT NULL DEFAULT '',
            screen_width TEXT NOT NULL DEFAULT '',
            screen_height TEXT NOT NULL DEFAULT '',
            captcha_score REAL,
            start_time TIMESTAMP NOT NULL,
            end_time TIMESTAMP,
            birth_year INTEGER,
            gender VARCHAR(2),
            native_english BOOLEAN,
            dyslexia BOOLEAN,
            adhd BOOLEAN,
            asd BOOLEAN,
            vision VARCHAR(10),
            vision_reason TEXT NOT NULL DEFAULT '',
            post_test_purpose TEXT NOT NULL DEFAULT '',
            post_test_other TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_critical_trials_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS critical_trials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            participant_id INTEGER NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
            item_id VARCHAR(80) NOT NULL,
            item INTEGER NOT NULL,
            item_type VARCHAR(80) NOT NULL,
            trial_index INTEGER NOT NULL,
            correct_answer TEXT NOT NULL DEFAULT '',
            response TEXT NOT NULL DEFAULT '',
            is_correct BOOLEAN,
            reaction_time REAL NOT NULL,
            condition VARCHAR(80) NOT NULL,
            first_mention VARCHAR(80) NOT NULL,
            recent_mention VARCHAR(80) NOT NULL,
            knowledge_cue VARCHAR(80) NOT NULL,
            start VARCHAR(80) NOT NULL,
            "end" VARCHAR(80) NOT NULL,
            is_start BOOLEAN,
            is_end BOOLEAN,
            passage_reading_time REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_critical_trials_participant ON critical_trials(participant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_attention_check_trials_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attention_check_trials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            participant_id INTEGER NOT NULL REFERENCES participants(id) ON DELETE CASCADE,
            item_id VARCHAR(80) NOT NULL,
            item INTEGER NOT NULL,
            item_type VARCHAR(80) NOT NULL,
            trial_index INTEGER NOT NULL,
            correct_answer TEXT NOT NULL DEFAULT '',
            response TEXT NOT NULL DEFAULT '',
            is_correct BOOLEAN,
            reaction_time REAL NOT NULL,
            question_id VARCHAR(80) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_attention_check_trials_participant ON attention_check_trials(participant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_admins_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            is_superuser BOOLEAN NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
