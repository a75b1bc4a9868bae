//! Mechanical Turk requester client
//!
//! Only one operation is needed: granting the "already participated"
//! qualification to a worker so the task's qualification requirement keeps
//! them from accepting it again. Requests are JSON 1.1 RPC calls signed with
//! AWS Signature Version 4.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use nlmfb_common::config::MturkConfig;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "mturk-requester";
const TARGET_PREFIX: &str = "MTurkRequesterServiceV20170117";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const SIGNED_HEADERS: &str = "content-type;host;x-amz-date;x-amz-target";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Crediting client errors
#[derive(Debug, Error)]
pub enum MturkError {
    #[error("MTurk credentials are not configured")]
    NotConfigured,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Raw outcome of an API call
#[derive(Debug, Clone, PartialEq)]
pub struct MturkResponse {
    pub status: u16,
    pub body: String,
}

/// Result of trying to block a worker, as recorded on the participant
#[derive(Debug, Clone, PartialEq)]
pub struct CreditOutcome {
    pub success: bool,
    /// Response body or error message, appended to the participant's notes
    pub note: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AssociateQualificationRequest<'a> {
    qualification_type_id: &'a str,
    worker_id: &'a str,
    integer_value: i64,
    send_notification: bool,
}

struct Credentials {
    access_key_id: String,
    secret_access_key: String,
}

/// Mechanical Turk requester API client
pub struct MturkClient {
    http_client: reqwest::Client,
    credentials: Option<Credentials>,
    region: String,
    endpoint: String,
    qualification_type_id: String,
}

impl MturkClient {
    pub fn new(config: &MturkConfig) -> Result<Self, MturkError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MturkError::NetworkError(e.to_string()))?;

        let credentials = if config.has_credentials() {
            Some(Credentials {
                access_key_id: config.access_key_id.clone().unwrap_or_default(),
                secret_access_key: config.secret_access_key.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://mturk-requester.{}.amazonaws.com", config.region));

        Ok(Self {
            http_client,
            credentials,
            region: config.region.clone(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            qualification_type_id: config.qualification_type_id.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Grant the repeat-participation qualification to `worker_id`
    pub async fn associate_qualification_with_worker(
        &self,
        worker_id: &str,
    ) -> Result<MturkResponse, MturkError> {
        if worker_id.trim().is_empty() {
            return Err(MturkError::InvalidRequest("worker id is empty".to_string()));
        }

        let payload = serde_json::to_string(&AssociateQualificationRequest {
            qualification_type_id: &self.qualification_type_id,
            worker_id,
            integer_value: 1,
            send_notification: false,
        })
        .map_err(|e| MturkError::InvalidRequest(e.to_string()))?;

        self.call("AssociateQualificationWithWorker", payload).await
    }

    /// Block a worker from future assignments and describe what happened
    pub async fn block_worker(&self, worker_id: &str) -> CreditOutcome {
        match self.associate_qualification_with_worker(worker_id).await {
            Ok(response) => {
                let success = response.status == 200;
                if success {
                    tracing::info!(worker_id, "Worker blocked from repeat participation");
                } else {
                    tracing::warn!(worker_id, status = response.status, "MTurk rejected qualification request");
                }
                CreditOutcome {
                    success,
                    note: format!("HTTPStatusCode {}: {}", response.status, response.body),
                }
            }
            Err(e) => {
                tracing::warn!(worker_id, "MTurk qualification request failed: {}", e);
                CreditOutcome {
                    success: false,
                    note: e.to_string(),
                }
            }
        }
    }

    async fn call(&self, operation: &str, payload: String) -> Result<MturkResponse, MturkError> {
        let credentials = self.credentials.as_ref().ok_or(MturkError::NotConfigured)?;

        let url = reqwest::Url::parse(&format!("{}/", self.endpoint))
            .map_err(|e| MturkError::InvalidRequest(format!("bad endpoint: {}", e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(MturkError::InvalidRequest("endpoint has no host".to_string()))
            }
        };

        let target = format!("{}.{}", TARGET_PREFIX, operation);
        let now = Utc::now();
        let authorization = authorization_header(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            &self.region,
            &host,
            &target,
            &payload,
            now,
        );

        let response = self
            .http_client
            .post(url)
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-date", amz_date(now))
            .header("x-amz-target", &target)
            .header("authorization", authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| MturkError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(MturkResponse { status, body })
    }
}

fn amz_date(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the SigV4 signing key for one day/region/service
fn signing_key(secret_access_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_access_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn authorization_header(
    access_key_id: &str,
    secret_access_key: &str,
    region: &str,
    host: &str,
    target: &str,
    payload: &str,
    at: DateTime<Utc>,
) -> String {
    let amz_date = amz_date(at);
    let date_stamp = at.format("%Y%m%d").to_string();

    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{}\nhost:{}\nx-amz-date:{}\nx-amz-target:{}\n\n{}\n{}",
        CONTENT_TYPE,
        host,
        amz_date,
        target,
        SIGNED_HEADERS,
        sha256_hex(payload.as_bytes())
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(secret_access_key, &date_stamp, region, SERVICE);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        access_key_id, credential_scope, SIGNED_HEADERS, signature
    )
}
