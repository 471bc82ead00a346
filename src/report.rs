use std::fmt::Write;

use crate::aggregate::sentiment_label;
use crate::models::DashboardSnapshot;
use crate::view::format_rating;

pub fn sentiment_share(value: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        value as f64 / total as f64 * 100.0
    }
}

pub fn build_report(backend: &str, snapshot: &DashboardSnapshot) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Realtor Feedback Report");
    let _ = writeln!(
        output,
        "Generated {} from {} ({} feedback records)",
        snapshot.loaded_at.format("%Y-%m-%d %H:%M UTC"),
        backend,
        snapshot.feedback.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Average Ratings by Agent");

    if snapshot.agent_ratings.is_empty() {
        let _ = writeln!(output, "No agent ratings available yet.");
    } else {
        for rating in &snapshot.agent_ratings {
            let _ = writeln!(output, "- {}: {:.2}/10", rating.name, rating.rating);
        }
    }

    let total: usize = snapshot.sentiments.iter().map(|slice| slice.value).sum();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Mix");

    if snapshot.sentiments.is_empty() {
        let _ = writeln!(output, "No sentiment data available yet.");
    } else {
        for slice in &snapshot.sentiments {
            let _ = writeln!(
                output,
                "- {}: {} ({:.0}%)",
                slice.name,
                slice.value,
                sentiment_share(slice.value, total)
            );
        }
    }

    if !snapshot.rejected.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped Records");
        for rejected in &snapshot.rejected {
            let _ = writeln!(output, "- feedback {}: {}", rejected.feedback_id, rejected.reason);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Client Feedback");

    if snapshot.feedback.is_empty() {
        let _ = writeln!(output, "No feedback data available yet.");
    } else {
        for record in &snapshot.feedback {
            let sentiment = sentiment_label(record);
            let rating = record
                .rating
                .map(|rating| format!(", rated {}/10", format_rating(rating)))
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} - {} ({}{}): {}",
                record.client_name, record.agent_name, sentiment, rating, record.summary
            );
            for item in &record.action_items {
                let _ = writeln!(output, "  - [ ] {}", item);
            }
        }
    }

    output
}
