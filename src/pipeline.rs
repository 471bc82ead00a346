use chrono::Utc;
use uuid::Uuid;

use crate::aggregate;
use crate::api::FeedbackApi;
use crate::enrich;
use crate::error::DashboardResult;
use crate::models::{DashboardSnapshot, SourceData};

/// Join and aggregate one set of source collections. Nothing carries over
/// from earlier cycles.
pub fn build_snapshot(source: &SourceData) -> DashboardSnapshot {
    let enrichment = enrich::enrich_feedback(&source.feedbacks, &source.clients, &source.agents);
    let agent_ratings = aggregate::rating_by_agent(&enrichment.records);
    let sentiments = aggregate::sentiment_distribution(&enrichment.records);

    DashboardSnapshot {
        cycle_id: Uuid::new_v4(),
        loaded_at: Utc::now(),
        feedback: enrichment.records,
        agent_ratings,
        sentiments,
        rejected: enrichment.rejected,
    }
}

/// Fetch, join and aggregate.
pub async fn load_snapshot(api: &FeedbackApi) -> DashboardResult<DashboardSnapshot> {
    let source = api.fetch_all().await?;
    let snapshot = build_snapshot(&source);
    tracing::info!(
        cycle_id = %snapshot.cycle_id,
        records = snapshot.feedback.len(),
        rated_agents = snapshot.agent_ratings.len(),
        rejected = snapshot.rejected.len(),
        "dashboard snapshot built"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agent, Client, Feedback};

    fn source() -> SourceData {
        let feedback = |id, agent_id, rating, sentiment: Option<&str>, items: &str| Feedback {
            id,
            client_id: Some(1),
            agent_id: Some(agent_id),
            call_id: None,
            rating,
            sentiment: sentiment.map(str::to_string),
            summary: format!("summary {id}"),
            action_items: Some(items.to_string()),
            created_at: None,
        };

        SourceData {
            feedbacks: vec![
                feedback(1, 1, Some(9.5), Some("Positive"), r#"["Share testimonial"]"#),
                feedback(2, 1, Some(7.0), Some("Neutral"), "[]"),
                feedback(3, 2, None, None, ""),
                feedback(4, 2, Some(3.0), Some("Negative"), "[broken"),
            ],
            clients: vec![Client { id: 1, name: "Robert Martinez".to_string(), phone: None, email: None }],
            agents: vec![
                Agent { id: 1, name: "Sarah Johnson".to_string(), brokerage: None },
                Agent { id: 2, name: "Michael Chen".to_string(), brokerage: None },
            ],
        }
    }

    #[test]
    fn snapshot_combines_join_and_aggregates() {
        let snapshot = build_snapshot(&source());

        assert_eq!(snapshot.feedback.len(), 3);
        assert_eq!(snapshot.rejected.len(), 1);
        assert_eq!(snapshot.rejected[0].feedback_id, 4);

        assert_eq!(snapshot.agent_ratings.len(), 1);
        assert_eq!(snapshot.agent_ratings[0].name, "Sarah Johnson");
        assert_eq!(snapshot.agent_ratings[0].rating, 8.25);

        let names: Vec<&str> = snapshot.sentiments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Positive", "Neutral"]);
        assert_eq!(snapshot.sentiments[1].value, 2);
    }

    #[test]
    fn rebuilding_yields_identical_derived_data() {
        let source = source();
        let first = build_snapshot(&source);
        let second = build_snapshot(&source);

        assert_eq!(first.feedback, second.feedback);
        assert_eq!(first.agent_ratings, second.agent_ratings);
        assert_eq!(first.sentiments, second.sentiments);
        assert_eq!(first.rejected, second.rejected);
        assert_ne!(first.cycle_id, second.cycle_id);
    }
}
