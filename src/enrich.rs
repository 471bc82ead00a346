use crate::error::MalformedRecord;
use crate::models::{Agent, Client, EnrichedFeedback, Feedback};

pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub records: Vec<EnrichedFeedback>,
    pub rejected: Vec<MalformedRecord>,
}

/// Joins feedback rows with their client and agent names, keeping the
/// order of `feedbacks`. Rows with unreadable `action_items` land in
/// `rejected` instead of failing the whole pass.
pub fn enrich_feedback(feedbacks: &[Feedback], clients: &[Client], agents: &[Agent]) -> Enrichment {
    let mut enrichment = Enrichment::default();

    for feedback in feedbacks {
        match enrich_one(feedback, clients, agents) {
            Ok(record) => enrichment.records.push(record),
            Err(rejection) => {
                tracing::warn!(
                    feedback_id = rejection.feedback_id,
                    reason = %rejection.reason,
                    "skipping malformed feedback record"
                );
                enrichment.rejected.push(rejection);
            }
        }
    }

    enrichment
}

pub fn enrich_one(
    feedback: &Feedback,
    clients: &[Client],
    agents: &[Agent],
) -> Result<EnrichedFeedback, MalformedRecord> {
    let action_items = parse_action_items(feedback.action_items.as_deref()).map_err(|err| {
        MalformedRecord {
            feedback_id: feedback.id,
            reason: err.to_string(),
        }
    })?;

    let client_name = feedback
        .client_id
        .and_then(|id| clients.iter().find(|client| client.id == id))
        .map(|client| client.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_NAME)
        .to_string();
    let agent_name = feedback
        .agent_id
        .and_then(|id| agents.iter().find(|agent| agent.id == id))
        .map(|agent| agent.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_NAME)
        .to_string();

    Ok(EnrichedFeedback {
        id: feedback.id,
        client_id: feedback.client_id,
        agent_id: feedback.agent_id,
        call_id: feedback.call_id,
        client_name,
        agent_name,
        rating: feedback.rating,
        sentiment: feedback.sentiment.clone(),
        summary: feedback.summary.clone(),
        action_items,
        created_at: feedback.created_at,
    })
}

/// Absent, blank and JSON `null` values all mean "no action items".
pub fn parse_action_items(raw: Option<&str>) -> Result<Vec<String>, serde_json::Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => {
            let items: Option<Vec<String>> = serde_json::from_str(text)?;
            Ok(items.unwrap_or_default())
        }
    }
}
