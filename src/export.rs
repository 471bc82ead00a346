use std::io::Write;

use serde::Serialize;

use crate::aggregate::sentiment_label;
use crate::models::EnrichedFeedback;

#[derive(Serialize)]
struct CsvRow<'a> {
    feedback_id: i64,
    call_id: Option<i64>,
    client_name: &'a str,
    agent_name: &'a str,
    sentiment: &'a str,
    rating: Option<f64>,
    summary: &'a str,
    action_items: String,
    created_at: String,
}

/// Writes one row per enriched record. Action items are joined with `"; "`.
pub fn write_feedback_csv<W: Write>(writer: W, feedback: &[EnrichedFeedback]) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for record in feedback {
        csv_writer.serialize(CsvRow {
            feedback_id: record.id,
            call_id: record.call_id,
            client_name: &record.client_name,
            agent_name: &record.agent_name,
            sentiment: sentiment_label(record),
            rating: record.rating,
            summary: &record.summary,
            action_items: record.action_items.join("; "),
            created_at: record
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        })?;
    }

    csv_writer.flush()?;
    Ok(feedback.len())
}

pub fn export_to_path(path: &std::path::Path, feedback: &[EnrichedFeedback]) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)?;
    write_feedback_csv(file, feedback)
}
