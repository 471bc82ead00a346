//! HTTP client for the realtor feedback backend.
//!
//! The backend owns all records; this side only reads the three collections
//! and asks it to place test calls.

use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, DashboardResult};
use crate::models::{Agent, Client, Feedback, SourceData};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const PHONE_REQUIRED: &str = "Please enter a phone number";
const CALL_FAILED_FALLBACK: &str = "Failed to initiate call";

#[derive(Debug, Clone)]
pub struct FeedbackApi {
    client: reqwest::Client,
    base_url: String,
}

/// What the backend said about a test call request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Initiated { call_sid: String },
    Failed { detail: String },
    Unreachable,
}

impl CallOutcome {
    pub fn status_message(&self) -> String {
        match self {
            CallOutcome::Initiated { call_sid } => format!("Call initiated! SID: {call_sid}"),
            CallOutcome::Failed { detail } => format!("Error: {detail}"),
            CallOutcome::Unreachable => "Error: Could not connect to backend".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Initiated { .. })
    }
}

#[derive(Debug, Deserialize)]
struct TestCallResponse {
    #[serde(default)]
    call_sid: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct TestCallForm<'a> {
    phone_number: &'a str,
}

impl FeedbackApi {
    pub fn new(base_url: &str, timeout: Duration) -> DashboardResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        Url::parse(trimmed).map_err(|err| DashboardError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DashboardError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DashboardResult<T> {
        let endpoint = self.endpoint(path);
        tracing::debug!(%endpoint, "fetching");

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        read_json(endpoint, response).await
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> DashboardResult<T> {
        let endpoint = self.endpoint(path);
        let response = self
            .client
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        read_json(endpoint, response).await
    }

    pub async fn fetch_feedbacks(&self) -> DashboardResult<Vec<Feedback>> {
        self.get_json("feedbacks/").await
    }

    pub async fn fetch_clients(&self) -> DashboardResult<Vec<Client>> {
        self.get_json("clients/").await
    }

    pub async fn fetch_agents(&self) -> DashboardResult<Vec<Agent>> {
        self.get_json("agents/").await
    }

    /// Issues the three reads concurrently. Any failure fails the whole load.
    pub async fn fetch_all(&self) -> DashboardResult<SourceData> {
        let (feedbacks, clients, agents) = tokio::try_join!(
            self.fetch_feedbacks(),
            self.fetch_clients(),
            self.fetch_agents()
        )?;

        tracing::info!(
            feedbacks = feedbacks.len(),
            clients = clients.len(),
            agents = agents.len(),
            "fetched dashboard sources"
        );

        Ok(SourceData {
            feedbacks,
            clients,
            agents,
        })
    }

    /// Asks the backend to place a test call. Callers validate the number
    /// first with [`validate_phone_number`].
    pub async fn trigger_test_call(&self, phone_number: &str) -> CallOutcome {
        let endpoint = self.endpoint("test-call");
        let result = self
            .client
            .post(&endpoint)
            .form(&TestCallForm { phone_number })
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(%endpoint, error = %err, "test call request failed");
                return CallOutcome::Unreachable;
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(%endpoint, error = %err, "could not read test call response");
                return CallOutcome::Unreachable;
            }
        };
        let parsed: TestCallResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::error!(%endpoint, %status, error = %err, "test call response is not JSON");
                return CallOutcome::Unreachable;
            }
        };

        let outcome = interpret_call_response(status.is_success(), parsed);
        match &outcome {
            CallOutcome::Initiated { call_sid } => tracing::info!(%call_sid, "test call initiated"),
            other => tracing::warn!(%status, outcome = ?other, "test call was not initiated"),
        }
        outcome
    }
}

async fn read_json<T: DeserializeOwned>(
    endpoint: String,
    response: reqwest::Response,
) -> DashboardResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(DashboardError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| DashboardError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;
    serde_json::from_slice(&body).map_err(|source| DashboardError::Decode { endpoint, source })
}

fn interpret_call_response(ok: bool, response: TestCallResponse) -> CallOutcome {
    if ok {
        if let Some(call_sid) = response.call_sid {
            return CallOutcome::Initiated { call_sid };
        }
        // The backend answers 200 with an `error` field when the carrier rejects the call.
        let detail = response
            .error
            .unwrap_or_else(|| CALL_FAILED_FALLBACK.to_string());
        return CallOutcome::Failed { detail };
    }

    // Backend validation errors carry a list here rather than a string.
    let detail = match response.detail {
        Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail,
        Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => {
            CALL_FAILED_FALLBACK.to_string()
        }
        Some(other) => other.to_string(),
    };
    CallOutcome::Failed { detail }
}

/// Trims the input and refuses empty numbers before any request is made.
pub fn validate_phone_number(raw: &str) -> DashboardResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::Validation(PHONE_REQUIRED.to_string()));
    }
    Ok(trimmed.to_string())
}
