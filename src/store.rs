//! Display state for the dashboard.
//!
//! Two independent machines live here: the data load
//! (`Loading -> Loaded | Failed`, where `Loading` is only the state before the
//! first result; later reloads keep the current view until they finish) and
//! the call trigger
//! (`Idle -> Submitting -> Succeeded | Failed`). Every change goes through
//! [`DashboardStore::apply`] so the transitions can be tested without a
//! server or a renderer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::CallOutcome;
use crate::error::{DashboardError, DashboardResult};
use crate::models::DashboardSnapshot;

pub const SUBMITTING_MESSAGE: &str = "Initiating call...";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Loaded { snapshot: DashboardSnapshot },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CallState {
    Idle,
    /// Input refused before any request was made.
    Rejected { message: String },
    Submitting { phone_number: String },
    Succeeded { call_sid: String },
    Failed { message: String },
}

impl CallState {
    pub fn status_message(&self) -> Option<String> {
        match self {
            CallState::Idle => None,
            CallState::Rejected { message } | CallState::Failed { message } => Some(message.clone()),
            CallState::Submitting { .. } => Some(SUBMITTING_MESSAGE.to_string()),
            CallState::Succeeded { call_sid } => Some(
                CallOutcome::Initiated {
                    call_sid: call_sid.clone(),
                }
                .status_message(),
            ),
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, CallState::Submitting { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CallState::Rejected { .. } | CallState::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    LoadSucceeded(DashboardSnapshot),
    LoadFailed(String),
    CallRejected(String),
    CallSubmitted(String),
    CallFinished(CallOutcome),
    RefreshScheduled(DateTime<Utc>),
    /// Carries the due time of the refresh that is starting; a marker set by
    /// a later schedule is left alone.
    RefreshStarted(DateTime<Utc>),
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStore {
    pub load: LoadState,
    pub call: CallState,
    pub refresh_due_at: Option<DateTime<Utc>>,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self {
            load: LoadState::Loading,
            call: CallState::Idle,
            refresh_due_at: None,
        }
    }
}

impl DashboardStore {
    pub fn apply(&mut self, event: StoreEvent) -> DashboardResult<()> {
        match event {
            StoreEvent::LoadSucceeded(snapshot) => self.load = LoadState::Loaded { snapshot },
            StoreEvent::LoadFailed(reason) => self.load = LoadState::Failed { reason },
            StoreEvent::CallRejected(message) => {
                self.ensure_not_submitting()?;
                self.call = CallState::Rejected { message };
            }
            StoreEvent::CallSubmitted(phone_number) => {
                self.ensure_not_submitting()?;
                self.call = CallState::Submitting { phone_number };
            }
            StoreEvent::CallFinished(outcome) => {
                if !self.call.is_submitting() {
                    tracing::warn!(?outcome, "call finished without a pending submission");
                }
                self.call = match outcome {
                    CallOutcome::Initiated { call_sid } => CallState::Succeeded { call_sid },
                    other => CallState::Failed {
                        message: other.status_message(),
                    },
                };
            }
            StoreEvent::RefreshScheduled(due_at) => self.refresh_due_at = Some(due_at),
            StoreEvent::RefreshStarted(due_at) => {
                if self.refresh_due_at == Some(due_at) {
                    self.refresh_due_at = None;
                }
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        match &self.load {
            LoadState::Loaded { snapshot } => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load, LoadState::Loading)
    }

    fn ensure_not_submitting(&self) -> DashboardResult<()> {
        if self.call.is_submitting() {
            return Err(DashboardError::CallInProgress);
        }
        Ok(())
    }
}
