//! Integration tests for log-odds scoring against a mock completion API
//!
//! - Echo prompts are built by filling the mask with each candidate
//! - Compound candidates are scored over their last two tokens
//! - Scored files feed straight into the accuracy summary

use nlmfb_analysis::accuracy::model_accuracy;
use nlmfb_analysis::completion_client::{ApiCredentials, CompletionClient};
use nlmfb_analysis::log_odds::{score_table, RESULT_COLUMNS};
use nlmfb_analysis::{AnalysisError, Table};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSAGE: &str =
    "Sam puts the keys in the cupboard. Alex moves them to the box. Sam looks for the keys in the [MASK]. ";
const STEM: &str =
    "Sam puts the keys in the cupboard. Alex moves them to the box. Sam looks for the keys in the";

fn credentials() -> ApiCredentials {
    ApiCredentials {
        organization: None,
        api_key: "sk-test".to_string(),
    }
}

fn passages() -> Table {
    let mut table = Table::new(vec![
        "item_id".to_string(),
        "passage".to_string(),
        "start".to_string(),
        "end".to_string(),
        "critical_a".to_string(),
    ]);
    table
        .push_row(vec![
            "1_fb_1_s_e_im".to_string(),
            PASSAGE.to_string(),
            "cupboard".to_string(),
            "box".to_string(),
            "cupboard".to_string(),
        ])
        .unwrap();
    table
}

fn logprobs(tokens: &[&str], lps: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"logprobs": {"tokens": tokens, "token_logprobs": lps}}]
    }))
}

async fn mount_completions(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/completions"))
        .and(body_partial_json(json!({"prompt": format!("{} cupboard", STEM), "echo": true})))
        .respond_with(logprobs(&["Sam", " the", " cup", "board"], json!([null, -1.0, -2.0, -0.5])))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/completions"))
        .and(body_partial_json(json!({"prompt": format!("{} box", STEM), "echo": true})))
        .respond_with(logprobs(&["Sam", " the", " box"], json!([null, -1.0, -1.0])))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/completions"))
        .and(body_partial_json(json!({"prompt": STEM, "echo": false, "max_tokens": 2})))
        .respond_with(logprobs(&[" cup", "board"], json!([-0.3, -0.4])))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_score_table_appends_results() {
    let server = MockServer::start().await;
    mount_completions(&server).await;

    let client = CompletionClient::new(&server.uri(), credentials(), 0).unwrap();
    let scored = score_table(&client, "davinci", &passages(), "start", "end")
        .await
        .unwrap();

    assert_eq!(scored.len(), 1);
    assert_eq!(&scored.headers()[5..], &RESULT_COLUMNS);
    assert_eq!(
        scored.column("passage").unwrap(),
        vec![format!("{} [MASK].", STEM).as_str()]
    );
    assert_eq!(scored.column("token_c1").unwrap(), vec!["cupboard"]);
    assert_eq!(scored.column("token_c2").unwrap(), vec!["box"]);
    assert_eq!(scored.column("c1_logprob").unwrap(), vec!["-2.5"]);
    assert_eq!(scored.column("c2_logprob").unwrap(), vec!["-1"]);
    assert_eq!(scored.column("log_odds").unwrap(), vec!["-1.5"]);
    assert_eq!(scored.column("lp_pred").unwrap(), vec!["box"]);
    assert_eq!(scored.column("pred_t1").unwrap(), vec!["cup"]);
    assert_eq!(scored.column("pred_t2").unwrap(), vec!["board"]);

    // Log odds picked the wrong location, greedy generation the right one
    let report = model_accuracy(&scored).unwrap();
    assert_eq!(report.lp_accuracy, 0.0);
    assert_eq!(report.tg_accuracy, 1.0);
}

#[tokio::test]
async fn test_missing_logprobs_fail_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": [{"text": ""}]})))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&server.uri(), credentials(), 0).unwrap();
    let err = score_table(&client, "davinci", &passages(), "start", "end")
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Completion(_)));
}

#[tokio::test]
async fn test_unknown_candidate_column() {
    let server = MockServer::start().await;
    let client = CompletionClient::new(&server.uri(), credentials(), 0).unwrap();

    let err = score_table(&client, "davinci", &passages(), "first", "end")
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
}
