//! Participant persistence

use chrono::{DateTime, Utc};
use nlmfb_common::db::{DebriefField, Demographics, DeviceInfo, NewParticipant, Participant};
use nlmfb_common::{Error, Result};
use sqlx::{Executor, Sqlite, SqlitePool};

/// Create a participant, returning its id
pub async fn insert_participant(
    pool: &SqlitePool,
    participant: &NewParticipant,
    start_time: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO participants (ip_address, key, get_args, study, start_time)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&participant.ip_address)
    .bind(&participant.key)
    .bind(&participant.get_args)
    .bind(&participant.study)
    .bind(start_time)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load a participant by id
pub async fn get_participant<'e, E>(executor: E, id: i64) -> Result<Participant>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Participant>("SELECT * FROM participants WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| participant_not_found(id))
}

/// Record device details and append the raw post to the participant's notes
pub async fn update_device(
    pool: &SqlitePool,
    id: i64,
    device: &DeviceInfo,
    raw_post: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE participants SET
            notes = notes || ?,
            ua_header = ?,
            screen_width = ?,
            screen_height = ?,
            worker_id = ?,
            assignment_id = ?
        WHERE id = ?
        "#,
    )
    .bind(raw_post)
    .bind(&device.ua_header)
    .bind(&device.screen_width)
    .bind(&device.screen_height)
    .bind(&device.worker_id)
    .bind(&device.assignment_id)
    .bind(id)
    .execute(pool)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

/// Store the CAPTCHA score (null when the provider gave none)
pub async fn set_captcha_score(pool: &SqlitePool, id: i64, score: Option<f64>) -> Result<()> {
    let result = sqlx::query("UPDATE participants SET captcha_score = ? WHERE id = ?")
        .bind(score)
        .bind(id)
        .execute(pool)
        .await?;

    ensure_updated(result.rows_affected(), id)
}

pub async fn apply_demographics<'e, E>(executor: E, id: i64, demographics: &Demographics) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE participants SET
            birth_year = ?,
            gender = ?,
            native_english = ?,
            dyslexia = ?,
            adhd = ?,
            asd = ?,
            vision = ?,
            vision_reason = ?
        WHERE id = ?
        "#,
    )
    .bind(demographics.birth_year)
    .bind(&demographics.gender)
    .bind(demographics.native_english)
    .bind(demographics.dyslexia)
    .bind(demographics.adhd)
    .bind(demographics.asd)
    .bind(&demographics.vision)
    .bind(&demographics.vision_reason)
    .bind(id)
    .execute(executor)
    .await?;

    ensure_updated(result.rows_affected(), id)
}

/// Store one post-test answer
pub async fn apply_debrief<'e, E>(executor: E, id: i64, field: DebriefField, value: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    // Column names come from a closed enum, never from the request
    let sql = format!("UPDATE participants SET {} = ? WHERE id = ?", field.column());
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(id)
        .execute(executor)
        .await?;

    ensure_updated(result.rows_affected(), id)
}

pub async fn set_end_time<'e, E>(executor: E, id: i64, end_time: DateTime<Utc>) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE participants SET end_time = ? WHERE id = ?")
        .bind(end_time)
        .bind(id)
        .execute(executor)
        .await?;

    ensure_updated(result.rows_affected(), id)
}

/// Append a line to the participant's notes
pub async fn append_note(pool: &SqlitePool, id: i64, note: &str) -> Result<()> {
    let result = sqlx::query("UPDATE participants SET notes = notes || ? || char(10) WHERE id = ?")
        .bind(note)
        .bind(id)
        .execute(pool)
        .await?;

    ensure_updated(result.rows_affected(), id)
}

fn ensure_updated(rows_affected: u64, id: i64) -> Result<()> {
    if rows_affected == 0 {
        Err(participant_not_found(id))
    } else {
        Ok(())
    }
}

fn participant_not_found(id: i64) -> Error {
    Error::NotFound(format!("participant {}", id))
}
