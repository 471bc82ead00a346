use crate::models::{AgentRating, EnrichedFeedback, SentimentSlice};

pub const DEFAULT_SENTIMENT: &str = "Neutral";
pub const FALLBACK_COLOR: &str = "#999999";

struct RatingAccumulator {
    agent_id: i64,
    name: String,
    total: f64,
    count: usize,
}

/// Mean rating per agent, in order of each agent's first rated record.
/// Unrated records and records without an agent are ignored.
pub fn rating_by_agent(feedback: &[EnrichedFeedback]) -> Vec<AgentRating> {
    let mut groups: Vec<RatingAccumulator> = Vec::new();

    for record in feedback {
        let (Some(agent_id), Some(rating)) = (record.agent_id, record.rating) else {
            continue;
        };

        match groups.iter_mut().find(|group| group.agent_id == agent_id) {
            Some(group) => {
                group.total += rating;
                group.count += 1;
            }
            None => groups.push(RatingAccumulator {
                agent_id,
                name: record.agent_name.clone(),
                total: rating,
                count: 1,
            }),
        }
    }

    groups
        .into_iter()
        .map(|group| AgentRating {
            agent_id: group.agent_id,
            name: group.name,
            rating: round_to_hundredths(group.total / group.count as f64),
        })
        .collect()
}

/// Absent and empty sentiments both read as [`DEFAULT_SENTIMENT`].
pub fn sentiment_label(record: &EnrichedFeedback) -> &str {
    record
        .sentiment
        .as_deref()
        .filter(|sentiment| !sentiment.is_empty())
        .unwrap_or(DEFAULT_SENTIMENT)
}

/// Record count per sentiment label, in order of first appearance.
pub fn sentiment_distribution(feedback: &[EnrichedFeedback]) -> Vec<SentimentSlice> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for record in feedback {
        let sentiment = sentiment_label(record);
        match counts.iter_mut().find(|(name, _)| name == sentiment) {
            Some((_, count)) => *count += 1,
            None => counts.push((sentiment.to_string(), 1)),
        }
    }

    counts
        .into_iter()
        .map(|(name, value)| SentimentSlice {
            color: sentiment_color(&name).to_string(),
            name,
            value,
        })
        .collect()
}

pub fn sentiment_color(sentiment: &str) -> &'static str {
    match sentiment {
        "Positive" => "#00C49F",
        "Neutral" => "#FFBB28",
        "Negative" => "#FF8042",
        _ => FALLBACK_COLOR,
    }
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(agent_id: Option<i64>, rating: Option<f64>, sentiment: Option<&str>) -> EnrichedFeedback {
        EnrichedFeedback {
            id: 0,
            client_id: Some(1),
            agent_id,
            call_id: None,
            client_name: "Jennifer Park".to_string(),
            agent_name: format!("Agent {}", agent_id.unwrap_or_default()),
            rating,
            sentiment: sentiment.map(str::to_string),
            summary: String::new(),
            action_items: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn averages_ratings_and_drops_unrated_agents() {
        let feedback = vec![
            record(Some(1), Some(8.0), None),
            record(Some(1), Some(6.0), None),
            record(Some(2), None, None),
        ];

        let ratings = rating_by_agent(&feedback);
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].agent_id, 1);
        assert_eq!(ratings[0].rating, 7.0);
    }

    #[test]
    fn rounds_mean_to_two_decimals() {
        let feedback = vec![
            record(Some(3), Some(5.0), None),
            record(Some(3), Some(6.0), None),
            record(Some(3), Some(6.0), None),
        ];
        assert_eq!(rating_by_agent(&feedback)[0].rating, 5.67);
        assert_eq!(round_to_hundredths(9.125), 9.13);
    }

    #[test]
    fn ratings_keep_first_appearance_order() {
        let feedback = vec![
            record(Some(9), Some(4.0), None),
            record(Some(2), Some(10.0), None),
            record(Some(9), Some(6.0), None),
        ];
        let ids: Vec<i64> = rating_by_agent(&feedback).iter().map(|r| r.agent_id).collect();
        assert_eq!(ids, vec![9, 2]);
    }

    #[test]
    fn records_without_agent_are_not_rated() {
        let feedback = vec![record(None, Some(9.0), None)];
        assert!(rating_by_agent(&feedback).is_empty());
    }

    #[test]
    fn missing_or_blank_sentiment_counts_as_neutral() {
        let feedback = vec![
            record(Some(1), None, Some("Positive")),
            record(Some(1), None, None),
            record(Some(1), None, Some("Neutral")),
            record(Some(1), None, Some("Mixed")),
            record(Some(1), None, Some("")),
        ];

        let slices = sentiment_distribution(&feedback);
        let summary: Vec<(&str, usize, &str)> = slices
            .iter()
            .map(|slice| (slice.name.as_str(), slice.value, slice.color.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Positive", 1, "#00C49F"),
                ("Neutral", 3, "#FFBB28"),
                ("Mixed", 1, "#999999"),
            ]
        );
    }

    #[test]
    fn color_lookup_matches_palette() {
        assert_eq!(sentiment_color("Positive"), "#00C49F");
        assert_eq!(sentiment_color("Neutral"), "#FFBB28");
        assert_eq!(sentiment_color("Negative"), "#FF8042");
        assert_eq!(sentiment_color("positive"), FALLBACK_COLOR);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let feedback = vec![
            record(Some(1), Some(9.5), Some("Positive")),
            record(Some(2), Some(6.5), Some("Negative")),
        ];
        assert_eq!(rating_by_agent(&feedback), rating_by_agent(&feedback));
        assert_eq!(sentiment_distribution(&feedback), sentiment_distribution(&feedback));
    }
}
