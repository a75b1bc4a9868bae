//! Trial persistence

use nlmfb_common::db::{AttentionCheckTrial, CriticalTrial, NewAttentionCheckTrial, NewCriticalTrial};
use nlmfb_common::Result;
use sqlx::{Executor, Sqlite, SqlitePool};

pub async fn insert_critical_trial<'e, E>(
    executor: E,
    participant_id: i64,
    trial: &NewCriticalTrial,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO critical_trials (
            participant_id, item_id, item, item_type, trial_index,
            correct_answer, response, is_correct, reaction_time,
            condition, first_mention, recent_mention, knowledge_cue, start, "end",
            is_start, is_end, passage_reading_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(participant_id)
    .bind(&trial.trial.item_id)
    .bind(trial.trial.item)
    .bind(&trial.trial.item_type)
    .bind(trial.trial.trial_index)
    .bind(&trial.trial.correct_answer)
    .bind(&trial.trial.response)
    .bind(trial.trial.is_correct)
    .bind(trial.trial.reaction_time)
    .bind(&trial.item_data.condition)
    .bind(&trial.item_data.first_mention)
    .bind(&trial.item_data.recent_mention)
    .bind(&trial.item_data.knowledge_cue)
    .bind(&trial.item_data.start)
    .bind(&trial.item_data.end)
    .bind(trial.is_start)
    .bind(trial.is_end)
    .bind(trial.passage_reading_time)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_attention_check_trial<'e, E>(
    executor: E,
    participant_id: i64,
    trial: &NewAttentionCheckTrial,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO attention_check_trials (
            participant_id, item_id, item, item_type, trial_index,
            correct_answer, response, is_correct, reaction_time, question_id
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(participant_id)
    .bind(&trial.trial.item_id)
    .bind(trial.trial.item)
    .bind(&trial.trial.item_type)
    .bind(trial.trial.trial_index)
    .bind(&trial.trial.correct_answer)
    .bind(&trial.trial.response)
    .bind(trial.trial.is_correct)
    .bind(trial.trial.reaction_time)
    .bind(&trial.question_id)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Critical trials recorded for a participant
pub async fn critical_trials_for(pool: &SqlitePool, participant_id: i64) -> Result<Vec<CriticalTrial>> {
    let trials = sqlx::query_as::<_, CriticalTrial>(
        "SELECT * FROM critical_trials WHERE participant_id = ? ORDER BY id",
    )
    .bind(participant_id)
    .fetch_all(pool)
    .await?;

    Ok(trials)
}

/// Attention check trials recorded for a participant, in timeline order
pub async fn attention_check_trials_for(
    pool: &SqlitePool,
    participant_id: i64,
) -> Result<Vec<AttentionCheckTrial>> {
    let trials = sqlx::query_as::<_, AttentionCheckTrial>(
        "SELECT * FROM attention_check_trials WHERE participant_id = ? ORDER BY id",
    )
    .bind(participant_id)
    .fetch_all(pool)
    .await?;

    Ok(trials)
}
