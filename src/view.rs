//! Turns the store into something the page template can print directly.
//! Chart geometry is worked out here so the template stays free of math.

use std::f64::consts::PI;

use askama::Template;

use crate::aggregate::sentiment_label;
use crate::models::{AgentRating, EnrichedFeedback, SentimentSlice};
use crate::store::{DashboardStore, LoadState};

pub const CHART_WIDTH: f64 = 400.0;
pub const CHART_HEIGHT: f64 = 300.0;
const RATING_MAX: f64 = 10.0;
const PLOT_LEFT: f64 = 40.0;
const PLOT_TOP: f64 = 10.0;
const PLOT_RIGHT: f64 = 10.0;
const PLOT_BOTTOM: f64 = 40.0;
const PIE_CENTER_X: f64 = 200.0;
const PIE_CENTER_Y: f64 = 150.0;
const PIE_RADIUS: f64 = 80.0;
const PIE_LABEL_OFFSET: f64 = 24.0;
pub const BAR_FILL: &str = "#8884d8";

#[derive(Debug, Clone, PartialEq)]
pub struct BarView {
    pub label: String,
    pub value: String,
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
    pub label_x: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickView {
    pub label: String,
    pub y: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliceView {
    pub label: String,
    pub color: String,
    /// Empty when the slice covers the whole pie; the template draws a circle.
    pub path: String,
    pub label_x: String,
    pub label_y: String,
    pub anchor: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackView {
    pub heading: String,
    pub sentiment: String,
    pub rating: Option<String>,
    pub summary: String,
    pub action_items: Vec<String>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub loading: bool,
    pub load_error: Option<String>,
    pub loaded_at: Option<String>,
    pub bars: Vec<BarView>,
    pub ticks: Vec<TickView>,
    pub slices: Vec<SliceView>,
    pub feedback: Vec<FeedbackView>,
    pub rejected_count: usize,
    pub call_status: Option<String>,
    pub call_error: bool,
    pub calling: bool,
    pub phone_number: String,
    pub refresh_due: Option<String>,
    pub chart_width: String,
    pub chart_height: String,
    pub axis_y: String,
    pub axis_x_end: String,
    pub pie_cx: String,
    pub pie_cy: String,
    pub pie_r: String,
    pub bar_fill: &'static str,
}

impl DashboardPage {
    pub fn from_store(store: &DashboardStore) -> Self {
        let (bars, slices, feedback, rejected_count, loaded_at) = match store.snapshot() {
            Some(snapshot) => (
                bar_chart(&snapshot.agent_ratings),
                pie_chart(&snapshot.sentiments),
                snapshot.feedback.iter().map(feedback_view).collect(),
                snapshot.rejected.len(),
                Some(snapshot.loaded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            ),
            _ => (Vec::new(), Vec::new(), Vec::new(), 0, None),
        };
        let load_error = match &store.load {
            LoadState::Failed { reason } => Some(reason.clone()),
            _ => None,
        };
        let phone_number = match &store.call {
            crate::store::CallState::Submitting { phone_number } => phone_number.clone(),
            _ => String::new(),
        };

        Self {
            loading: store.is_loading(),
            load_error,
            loaded_at,
            bars,
            ticks: rating_ticks(),
            slices,
            feedback,
            rejected_count,
            call_status: store.call.status_message(),
            call_error: store.call.is_error(),
            calling: store.call.is_submitting(),
            phone_number,
            refresh_due: store
                .refresh_due_at
                .map(|due| due.format("%H:%M:%S UTC").to_string()),
            chart_width: fmt(CHART_WIDTH),
            chart_height: fmt(CHART_HEIGHT),
            axis_y: fmt(CHART_HEIGHT - PLOT_BOTTOM),
            axis_x_end: fmt(CHART_WIDTH - PLOT_RIGHT),
            pie_cx: fmt(PIE_CENTER_X),
            pie_cy: fmt(PIE_CENTER_Y),
            pie_r: fmt(PIE_RADIUS),
            bar_fill: BAR_FILL,
        }
    }
}

fn plot_height() -> f64 {
    CHART_HEIGHT - PLOT_TOP - PLOT_BOTTOM
}

pub fn bar_chart(ratings: &[AgentRating]) -> Vec<BarView> {
    if ratings.is_empty() {
        return Vec::new();
    }

    let band = (CHART_WIDTH - PLOT_LEFT - PLOT_RIGHT) / ratings.len() as f64;
    let plot_height = plot_height();

    ratings
        .iter()
        .enumerate()
        .map(|(index, rating)| {
            let clamped = rating.rating.clamp(0.0, RATING_MAX);
            let height = clamped / RATING_MAX * plot_height;
            let x = PLOT_LEFT + band * index as f64 + band * 0.2;
            BarView {
                label: rating.name.clone(),
                value: format!("{:.2}", rating.rating),
                x: fmt(x),
                y: fmt(PLOT_TOP + plot_height - height),
                width: fmt(band * 0.6),
                height: fmt(height),
                label_x: fmt(x + band * 0.3),
            }
        })
        .collect()
}

fn rating_ticks() -> Vec<TickView> {
    let plot_height = plot_height();
    (0..=5)
        .map(|step| {
            let value = step as f64 * 2.0;
            TickView {
                label: format!("{value:.0}"),
                y: fmt(PLOT_TOP + plot_height - value / RATING_MAX * plot_height),
            }
        })
        .collect()
}

/// Slices start at twelve o'clock and run clockwise. Labels read
/// `"<name> <percent>%"` with the percentage rounded to a whole number.
pub fn pie_chart(slices: &[SentimentSlice]) -> Vec<SliceView> {
    let total: usize = slices.iter().map(|slice| slice.value).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut start = -PI / 2.0;
    slices
        .iter()
        .map(|slice| {
            let fraction = slice.value as f64 / total as f64;
            let sweep = fraction * 2.0 * PI;
            let end = start + sweep;
            let middle = start + sweep / 2.0;

            let path = if slice.value == total {
                String::new()
            } else {
                let (x1, y1) = point_on_circle(PIE_RADIUS, start);
                let (x2, y2) = point_on_circle(PIE_RADIUS, end);
                let large_arc = if sweep > PI { 1 } else { 0 };
                format!(
                    "M {} {} L {} {} A {} {} 0 {} 1 {} {} Z",
                    fmt(PIE_CENTER_X),
                    fmt(PIE_CENTER_Y),
                    fmt(x1),
                    fmt(y1),
                    fmt(PIE_RADIUS),
                    fmt(PIE_RADIUS),
                    large_arc,
                    fmt(x2),
                    fmt(y2)
                )
            };

            let (label_x, label_y) = point_on_circle(PIE_RADIUS + PIE_LABEL_OFFSET, middle);
            let anchor = if label_x >= PIE_CENTER_X { "start" } else { "end" };
            start = end;

            SliceView {
                label: format!("{} {:.0}%", slice.name, fraction * 100.0),
                color: slice.color.clone(),
                path,
                label_x: fmt(label_x),
                label_y: fmt(label_y),
                anchor,
            }
        })
        .collect()
}

fn point_on_circle(radius: f64, angle: f64) -> (f64, f64) {
    (
        PIE_CENTER_X + radius * angle.cos(),
        PIE_CENTER_Y + radius * angle.sin(),
    )
}

pub fn feedback_view(record: &EnrichedFeedback) -> FeedbackView {
    FeedbackView {
        heading: format!("{} - {}", record.client_name, record.agent_name),
        sentiment: sentiment_label(record).to_string(),
        rating: record.rating.map(format_rating),
        summary: record.summary.clone(),
        action_items: record.action_items.clone(),
    }
}

/// `7.0` prints as `7`, `9.5` stays `9.5`.
pub fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{rating:.0}")
    } else {
        let text = format!("{rating:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn fmt(value: f64) -> String {
    format!("{value:.2}")
}
