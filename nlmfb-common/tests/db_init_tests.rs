//! Integration tests for database initialization
//!
//! Covers automatic database creation, reopening an existing file and the
//! shape of the tables the experiment service writes to.

use nlmfb_common::db::init::{init_database, init_memory_database};
use sqlx::{Row, SqlitePool};
use tempfile::TempDir;

async fn column_names(pool: &SqlitePool, table: &str) -> Vec<String> {
    sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get::<String, _>(1))
        .collect()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("nlm_fb.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());

    // Parent directory and file were created
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nlm_fb.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO participants (ip_address, key, study, start_time) VALUES ('1.2.3.4', 'apple', 'pilot', CURRENT_TIMESTAMP)",
    )
    .execute(&pool1)
    .await
    .unwrap();
    pool1.close().await;

    // Reopening keeps existing rows
    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(
        tables,
        vec!["admins", "attention_check_trials", "critical_trials", "participants"]
    );
}

#[tokio::test]
async fn test_trial_tables_share_response_columns() {
    let pool = init_memory_database().await.unwrap();

    let critical = column_names(&pool, "critical_trials").await;
    let attention = column_names(&pool, "attention_check_trials").await;

    for common in [
        "participant_id",
        "item_id",
        "item",
        "item_type",
        "trial_index",
        "correct_answer",
        "response",
        "is_correct",
        "reaction_time",
    ] {
        assert!(critical.contains(&common.to_string()), "critical_trials missing {}", common);
        assert!(attention.contains(&common.to_string()), "attention_check_trials missing {}", common);
    }

    assert!(critical.contains(&"passage_reading_time".to_string()));
    assert!(critical.contains(&"end".to_string()));
    assert!(attention.contains(&"question_id".to_string()));
}

#[tokio::test]
async fn test_trials_cascade_with_participant() {
    let pool = init_memory_database().await.unwrap();

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO participants (ip_address, key, study, start_time) VALUES ('', 'apple', '', CURRENT_TIMESTAMP) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO attention_check_trials (participant_id, item_id, item, item_type, trial_index, reaction_time, question_id) VALUES (?, 'x', 1, 'attention_check', 3, 100.0, 'start_loc')",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM participants WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attention_check_trials")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_trial_requires_existing_participant() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query(
        "INSERT INTO attention_check_trials (participant_id, item_id, item, item_type, trial_index, reaction_time, question_id) VALUES (42, 'x', 1, 'attention_check', 3, 100.0, 'start_loc')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Foreign key should reject unknown participant");
}
