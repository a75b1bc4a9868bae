//! Raw results backup
//!
//! Every submission is written to disk untouched before anything is parsed,
//! so a bad payload or a database failure never loses a participant's data.

use chrono::{DateTime, Utc};
use nlmfb_common::time::file_timestamp;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Write `payload` as pretty JSON to `<dir>/<timestamp>-<ppt_id>.json`
pub async fn save_json_results(
    results_dir: &Path,
    payload: &Value,
    at: DateTime<Utc>,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(results_dir).await?;

    let ppt_id = match payload.get("ppt_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "None".to_string(),
        Some(other) => other.to_string(),
    };
    let path = results_dir.join(format!("{}-{}.json", file_timestamp(at), ppt_id));

    let contents = serde_json::to_vec_pretty(payload)?;
    tokio::fs::write(&path, contents).await?;

    tracing::info!("Saved raw results backup: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_backup_file_name_and_contents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("results");
        let at = Utc.with_ymd_and_hms(2022, 4, 2, 13, 5, 9).unwrap();
        let payload = json!({"ppt_id": 17, "results": [{"rt": 1}]});

        let path = save_json_results(&dir, &payload, at).await.unwrap();

        assert_eq!(path, dir.join("2022-04-02-13-05-09-17.json"));
        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, payload);
        assert!(std::fs::read_to_string(&path).unwrap().contains("\n  "));
    }

    #[tokio::test]
    async fn test_backup_without_participant_id() {
        let temp = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2022, 4, 2, 13, 5, 9).unwrap();

        let path = save_json_results(temp.path(), &json!({"results": []}), at).await.unwrap();
        assert!(path.ends_with("2022-04-02-13-05-09-None.json"));
    }
}
