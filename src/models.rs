use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MalformedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub brokerage: Option<String>,
}

/// A feedback row as the backend stores it. `action_items` is still the
/// JSON-encoded string column here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub agent_id: Option<i64>,
    #[serde(default)]
    pub call_id: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub action_items: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedFeedback {
    pub id: i64,
    pub client_id: Option<i64>,
    pub agent_id: Option<i64>,
    pub call_id: Option<i64>,
    pub client_name: String,
    pub agent_name: String,
    pub rating: Option<f64>,
    pub sentiment: Option<String>,
    pub summary: String,
    pub action_items: Vec<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRating {
    pub agent_id: i64,
    pub name: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSlice {
    pub name: String,
    pub value: usize,
    pub color: String,
}

/// Everything one fetch → join → aggregate cycle produces.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub cycle_id: Uuid,
    pub loaded_at: DateTime<Utc>,
    pub feedback: Vec<EnrichedFeedback>,
    pub agent_ratings: Vec<AgentRating>,
    pub sentiments: Vec<SentimentSlice>,
    pub rejected: Vec<MalformedRecord>,
}

/// Raw collections returned by the three backend reads.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub feedbacks: Vec<Feedback>,
    pub clients: Vec<Client>,
    pub agents: Vec<Agent>,
}
