//! Results ingestion
//!
//! A submission is the participant's whole jsPsych timeline: one JSON
//! object per trial event. Events are sorted into the records they feed
//! and written in a single transaction, so a submission is stored entirely
//! or not at all.
//!
//! Events are identified by two markers:
//! - `trial_part`: `passage`, `demographics`, `post_test`, ...
//! - `item_type`: `critical` or `attention_check`

use chrono::{DateTime, Utc};
use nlmfb_common::db::{
    CriticalItemData, DebriefField, Demographics, NewAttentionCheckTrial, NewCriticalTrial,
    TrialResponse,
};
use nlmfb_common::{Error, Result};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::{participants, trials};

/// A submission sorted by destination record
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionedResults {
    pub critical: NewCriticalTrial,
    pub attention_checks: Vec<NewAttentionCheckTrial>,
    pub demographics: Option<Demographics>,
    pub debrief: Vec<(DebriefField, String)>,
}

/// Sort trial events into records
///
/// The passage event and the critical event are required; demographics and
/// debrief are stored only when present.
pub fn partition_results(events: &[Value]) -> Result<PartitionedResults> {
    let passage = events
        .iter()
        .find(|e| str_field(e, "trial_part") == "passage")
        .ok_or_else(|| Error::InvalidInput("results contain no passage event".to_string()))?;
    let critical = events
        .iter()
        .find(|e| str_field(e, "item_type") == "critical")
        .ok_or_else(|| Error::InvalidInput("results contain no critical trial".to_string()))?;

    let critical = NewCriticalTrial {
        trial: trial_response(critical)?,
        item_data: CriticalItemData {
            condition: str_field(critical, "condition"),
            first_mention: str_field(critical, "first_mention"),
            recent_mention: str_field(critical, "recent_mention"),
            knowledge_cue: str_field(critical, "knowledge_cue"),
            start: str_field(critical, "start"),
            end: str_field(critical, "end"),
        },
        is_start: bool_field(critical, "is_start"),
        is_end: bool_field(critical, "is_end"),
        passage_reading_time: required_float(passage, "rt", "passage")?,
    };

    let attention_checks = events
        .iter()
        .filter(|e| str_field(e, "item_type") == "attention_check")
        .map(|e| {
            Ok(NewAttentionCheckTrial {
                trial: trial_response(e)?,
                question_id: str_field(e, "question_id"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let demographics = events
        .iter()
        .find(|e| str_field(e, "trial_part") == "demographics")
        .map(parse_demographics)
        .transpose()?;

    let mut debrief = Vec::new();
    for event in events.iter().filter(|e| str_field(e, "trial_part") == "post_test") {
        for (name, value) in responses(event)? {
            match DebriefField::from_name(&name) {
                Some(field) => debrief.push((field, value_to_string(&value))),
                None => warn!("Ignoring unknown post-test field '{}'", name),
            }
        }
    }

    Ok(PartitionedResults {
        critical,
        attention_checks,
        demographics,
        debrief,
    })
}

/// Persist a partitioned submission and stamp the participant's end time
pub async fn store_results(
    pool: &SqlitePool,
    participant_id: i64,
    results: &PartitionedResults,
    end_time: DateTime<Utc>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    trials::insert_critical_trial(&mut *tx, participant_id, &results.critical).await?;
    for check in &results.attention_checks {
        trials::insert_attention_check_trial(&mut *tx, participant_id, check).await?;
    }

    if let Some(demographics) = &results.demographics {
        participants::apply_demographics(&mut *tx, participant_id, demographics).await?;
    }
    for (field, value) in &results.debrief {
        participants::apply_debrief(&mut *tx, participant_id, *field, value).await?;
    }

    participants::set_end_time(&mut *tx, participant_id, end_time).await?;

    tx.commit().await?;

    debug!(
        participant_id,
        attention_checks = results.attention_checks.len(),
        demographics = results.demographics.is_some(),
        "Stored results"
    );
    Ok(())
}

fn trial_response(event: &Value) -> Result<TrialResponse> {
    let item_type = str_field(event, "item_type");
    Ok(TrialResponse {
        item_id: str_field(event, "item_id"),
        item: required_int(event, "item", &item_type)?,
        trial_index: required_int(event, "trial_index", &item_type)?,
        reaction_time: required_float(event, "rt", &item_type)?,
        correct_answer: str_field(event, "correct_answer"),
        response: str_field(event, "response"),
        is_correct: bool_field(event, "is_correct"),
        item_type,
    })
}

fn parse_demographics(event: &Value) -> Result<Demographics> {
    let answers = responses(event)?;
    let answer = |key: &str| answers.get(key).map(value_to_string);

    let birth_year = match answer("demographics_year").as_deref().map(str::trim) {
        None | Some("") => None,
        Some(year) => Some(year.parse::<i64>().map_err(|_| {
            Error::InvalidInput(format!("demographics_year '{}' is not a year", year))
        })?),
    };

    Ok(Demographics {
        birth_year,
        gender: answer("demographics_gender"),
        native_english: answer("demographics_english").as_deref() == Some("yes"),
        dyslexia: answer("dyslexia").as_deref() == Some("true"),
        adhd: answer("adhd").as_deref() == Some("true"),
        asd: answer("asd").as_deref() == Some("true"),
        vision: answer("demographics_vision").unwrap_or_default(),
        vision_reason: answer("demographics_vision_reason").unwrap_or_default(),
    })
}

/// Survey answers: jsPsych encodes them as a JSON string, but an inline
/// object is accepted too
fn responses(event: &Value) -> Result<Map<String, Value>> {
    match event.get("responses") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw)
            .map_err(|e| Error::InvalidInput(format!("responses are not valid JSON: {}", e)))?
        {
            Value::Object(map) => Ok(map),
            _ => Err(Error::InvalidInput("responses must be a JSON object".to_string())),
        },
        Some(_) => Err(Error::InvalidInput("responses must be a JSON object".to_string())),
    }
}

/// Text form of a JSON value: strings verbatim, null as empty
fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn str_field(event: &Value, key: &str) -> String {
    event.get(key).map(value_to_string).unwrap_or_default()
}

fn int_field(event: &Value, key: &str) -> Option<i64> {
    match event.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(event: &Value, key: &str) -> Option<f64> {
    match event.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bool_field(event: &Value, key: &str) -> Option<bool> {
    match event.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn required_int(event: &Value, key: &str, context: &str) -> Result<i64> {
    int_field(event, key).ok_or_else(|| missing(key, context))
}

fn required_float(event: &Value, key: &str, context: &str) -> Result<f64> {
    float_field(event, key).ok_or_else(|| missing(key, context))
}

fn missing(key: &str, context: &str) -> Error {
    Error::InvalidInput(format!("{} event has no valid '{}'", context, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timeline() -> Vec<Value> {
        vec![
            json!({"trial_type": "html-keyboard-response", "trial_index": 0, "rt": 2100}),
            json!({"trial_part": "passage", "trial_index": 1, "rt": 15320.5}),
            json!({
                "trial_part": "trial", "item_type": "critical", "trial_index": 2,
                "item": 3, "item_id": "3_fb_1_s_e_im",
                "condition": "False Belief", "first_mention": "start",
                "recent_mention": "end", "knowledge_cue": "implicit",
                "start": "box", "end": "basket", "correct_answer": "box",
                "response": "Box", "rt": 4200, "is_correct": true,
                "is_start": true, "is_end": false,
                "responses": "{\"critical-response\":\"Box\"}"
            }),
            json!({
                "trial_part": "trial", "item_type": "attention_check", "question_id": "start_loc",
                "trial_index": 3, "item": 3, "item_id": "3_fb_1_s_e_im",
                "correct_answer": "box", "response": "box", "rt": 3000, "is_correct": true
            }),
            json!({
                "trial_part": "trial", "item_type": "attention_check", "question_id": "end_loc",
                "trial_index": 4, "item": 3, "item_id": "3_fb_1_s_e_im",
                "correct_answer": "basket", "response": "bag", "rt": 2500, "is_correct": false
            }),
            json!({
                "trial_part": "demographics", "trial_index": 5,
                "responses": "{\"demographics_year\":\"1988\",\"demographics_gender\":\"f\",\"demographics_english\":\"yes\",\"dyslexia\":\"true\",\"demographics_vision\":\"yes\"}"
            }),
            json!({
                "trial_part": "post_test", "trial_index": 6,
                "responses": "{\"post_test_purpose\":\"memory\",\"post_test_other\":\"\",\"key\":\"hijack\"}"
            }),
        ]
    }

    #[test]
    fn test_partition_full_timeline() {
        let results = partition_results(&timeline()).unwrap();

        assert_eq!(results.critical.trial.item_id, "3_fb_1_s_e_im");
        assert_eq!(results.critical.trial.item, 3);
        assert_eq!(results.critical.trial.trial_index, 2);
        assert_eq!(results.critical.trial.response, "Box");
        assert_eq!(results.critical.trial.reaction_time, 4200.0);
        assert_eq!(results.critical.trial.is_correct, Some(true));
        assert_eq!(results.critical.item_data.end, "basket");
        assert_eq!(results.critical.is_start, Some(true));
        assert_eq!(results.critical.is_end, Some(false));
        assert_eq!(results.critical.passage_reading_time, 15320.5);

        let questions: Vec<_> = results.attention_checks.iter().map(|c| c.question_id.as_str()).collect();
        assert_eq!(questions, vec!["start_loc", "end_loc"]);
        assert_eq!(results.attention_checks[1].trial.is_correct, Some(false));

        let demographics = results.demographics.unwrap();
        assert_eq!(demographics.birth_year, Some(1988));
        assert_eq!(demographics.gender.as_deref(), Some("f"));
        assert!(demographics.native_english);
        assert!(demographics.dyslexia);
        assert!(!demographics.adhd);
        assert_eq!(demographics.vision, "yes");
        assert_eq!(demographics.vision_reason, "");

        // Response keys come back in map order, not form order
        assert_eq!(results.debrief.len(), 2);
        assert!(results.debrief.contains(&(DebriefField::Purpose, "memory".to_string())));
        assert!(results.debrief.contains(&(DebriefField::Other, String::new())));
    }

    #[test]
    fn test_missing_passage_is_rejected() {
        let events: Vec<Value> = timeline()
            .into_iter()
            .filter(|e| e["trial_part"] != "passage")
            .collect();
        assert!(matches!(partition_results(&events), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_critical_is_rejected() {
        let events: Vec<Value> = timeline()
            .into_iter()
            .filter(|e| e["item_type"] != "critical")
            .collect();
        assert!(matches!(partition_results(&events), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_blank_birth_year_is_null() {
        let events = vec![
            json!({"trial_part": "passage", "rt": 1}),
            json!({"item_type": "critical", "item": 1, "trial_index": 2, "rt": 10}),
            json!({"trial_part": "demographics", "responses": "{\"demographics_year\":\"\"}"}),
        ];
        let results = partition_results(&events).unwrap();
        let demographics = results.demographics.unwrap();
        assert_eq!(demographics.birth_year, None);
        assert_eq!(demographics.gender, None);
        assert!(!demographics.native_english);
        assert!(results.attention_checks.is_empty());
        assert!(results.debrief.is_empty());
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let event = json!({"item": "4", "trial_index": 2.0, "rt": "812.25"});
        assert_eq!(int_field(&event, "item"), Some(4));
        assert_eq!(int_field(&event, "trial_index"), Some(2));
        assert_eq!(float_field(&event, "rt"), Some(812.25));
        assert_eq!(bool_field(&json!({"b": "False"}), "b"), Some(false));
        assert_eq!(bool_field(&json!({"b": null}), "b"), None);
    }
}
