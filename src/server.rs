//! Dashboard HTTP server: renders the page, exposes the current state as
//! JSON and forwards test-call requests to the backend.

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::{watch, Mutex, RwLock};
use tower_http::trace::TraceLayer;

use crate::api::{self, CallOutcome, FeedbackApi};
use crate::config::Settings;
use crate::error::{DashboardError, DashboardResult};
use crate::pipeline;
use crate::store::{DashboardStore, StoreEvent};
use crate::view::DashboardPage;

pub struct AppState {
    pub api: FeedbackApi,
    pub store: RwLock<DashboardStore>,
    pub refresh_delay: Duration,
    /// Held for a whole reload so results land in the order reloads began.
    reload_lock: Mutex<()>,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Returns the shared state and the sender that marks it shut down.
    pub fn new(api: FeedbackApi, refresh_delay: Duration) -> (Arc<Self>, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(Self {
            api,
            store: RwLock::new(DashboardStore::default()),
            refresh_delay,
            reload_lock: Mutex::new(()),
            shutdown: shutdown_rx,
        });
        (state, shutdown_tx)
    }

    pub async fn apply(&self, event: StoreEvent) -> DashboardResult<()> {
        self.store.write().await.apply(event)
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

#[derive(Debug, Deserialize)]
pub struct CallForm {
    #[serde(default)]
    pub phone_number: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/dashboard", get(dashboard_json))
        .route("/test-call", post(test_call))
        .route("/refresh", post(refresh_now))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let api = FeedbackApi::new(&settings.api_url, settings.request_timeout)?;
    let (state, shutdown_tx) = AppState::new(api, settings.refresh_delay);

    let initial = Arc::clone(&state);
    tokio::spawn(async move {
        reload(&initial).await;
    });

    let listener = tokio::net::TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    tracing::info!(
        bind = %settings.bind,
        backend = %state.api.base_url(),
        "dashboard listening"
    );

    axum::serve(listener, router(Arc::clone(&state)))
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "could not listen for shutdown signal");
            }
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("dashboard server failed")?;

    Ok(())
}

/// One full fetch → join → aggregate cycle. Failures replace whatever was
/// shown before; nothing is retried. Reloads run one at a time.
pub async fn reload(state: &AppState) {
    let _guard = state.reload_lock.lock().await;
    let event = match pipeline::load_snapshot(&state.api).await {
        Ok(snapshot) => StoreEvent::LoadSucceeded(snapshot),
        Err(err) => {
            tracing::error!(error = %err, "abandoning dashboard load");
            StoreEvent::LoadFailed(err.to_string())
        }
    };
    if let Err(err) = state.apply(event).await {
        tracing::warn!(error = %err, "load result was not applied");
    }
}

/// Runs exactly one reload after the configured delay unless the server
/// shuts down first.
pub async fn schedule_refresh(state: &Arc<AppState>) {
    let delay = state.refresh_delay;
    let due_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    if let Err(err) = state.apply(StoreEvent::RefreshScheduled(due_at)).await {
        tracing::warn!(error = %err, "refresh marker was not applied");
    }

    let weak: Weak<AppState> = Arc::downgrade(state);
    let mut shutdown = state.shutdown.clone();
    tracing::info!(delay_secs = delay.as_secs(), "refresh scheduled");

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                tracing::debug!("server stopped before scheduled refresh");
                return;
            }
        }

        let Some(state) = weak.upgrade() else {
            tracing::debug!("dashboard state gone before scheduled refresh");
            return;
        };
        if state.is_shut_down() {
            tracing::debug!("server stopped before scheduled refresh");
            return;
        }

        if let Err(err) = state.apply(StoreEvent::RefreshStarted(due_at)).await {
            tracing::warn!(error = %err, "refresh marker was not cleared");
        }
        reload(&state).await;
    });
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, Response> {
    let store = state.store.read().await;
    DashboardPage::from_store(&store)
        .render()
        .map(Html)
        .map_err(|err| {
            tracing::error!(error = %err, "failed to render dashboard");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render dashboard").into_response()
        })
}

async fn dashboard_json(State(state): State<Arc<AppState>>) -> Json<DashboardStore> {
    Json(state.store.read().await.clone())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn refresh_now(State(state): State<Arc<AppState>>) -> Redirect {
    reload(&state).await;
    Redirect::to("/")
}

async fn test_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<CallForm>,
) -> Result<Response, DashboardError> {
    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    let phone_number = match api::validate_phone_number(&form.phone_number) {
        Ok(phone_number) => phone_number,
        Err(DashboardError::Validation(message)) => {
            state.apply(StoreEvent::CallRejected(message.clone())).await?;
            if wants_json {
                return Err(DashboardError::Validation(message));
            }
            return Ok(Redirect::to("/").into_response());
        }
        Err(other) => return Err(other),
    };

    state.apply(StoreEvent::CallSubmitted(phone_number.clone())).await?;
    let outcome = place_call(&state, phone_number).await;

    if wants_json {
        let status = if outcome.is_success() {
            StatusCode::OK
        } else {
            StatusCode::BAD_GATEWAY
        };
        let body = serde_json::json!({
            "status": outcome.status_message(),
            "result": outcome,
        });
        return Ok((status, Json(body)).into_response());
    }
    Ok(Redirect::to("/").into_response())
}

/// Runs the submitted call to completion on its own task, so the store
/// leaves `Submitting` even when the request that started it goes away.
async fn place_call(state: &Arc<AppState>, phone_number: String) -> CallOutcome {
    let task_state = Arc::clone(state);
    let task = tokio::spawn(async move {
        let outcome = task_state.api.trigger_test_call(&phone_number).await;
        if let Err(err) = task_state.apply(StoreEvent::CallFinished(outcome.clone())).await {
            tracing::warn!(error = %err, "call result was not applied");
        }
        if outcome.is_success() {
            schedule_refresh(&task_state).await;
        }
        outcome
    });

    match task.await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "test call task failed");
            let outcome = CallOutcome::Unreachable;
            if let Err(err) = state.apply(StoreEvent::CallFinished(outcome.clone())).await {
                tracing::warn!(error = %err, "call result was not applied");
            }
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::store::{CallState, LoadState};

    fn state_for(server: &MockServer, delay: Duration) -> (Arc<AppState>, watch::Sender<bool>) {
        let api = FeedbackApi::new(&server.uri(), Duration::from_secs(5)).unwrap();
        AppState::new(api, delay)
    }

    async fn mount_collections(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/feedbacks/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "client_id": 1, "agent_id": 1, "sentiment": "Positive", "rating": 9.0,
                 "summary": "Smooth closing", "action_items": "[]"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/clients/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "Jennifer Park"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/agents/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "Michael Chen"}
            ])))
            .mount(server)
            .await;
    }

    fn call_request(phone: &str, json: bool) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/test-call")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if json {
            builder = builder.header(header::ACCEPT, "application/json");
        }
        builder
            .body(Body::from(format!("phone_number={phone}")))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let server = MockServer::start().await;
        let (state, _shutdown) = state_for(&server, Duration::from_secs(30));

        let response = router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_phone_number_never_reaches_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/test-call"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (state, _shutdown) = state_for(&server, Duration::from_secs(30));

        let response = router(Arc::clone(&state))
            .oneshot(call_request("%20%20", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let store = state.store.read().await;
        assert_eq!(
            store.call.status_message().as_deref(),
            Some(api::PHONE_REQUIRED)
        );
    }

    #[tokio::test]
    async fn backend_failure_sets_error_and_skips_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/test-call"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"detail": "busy"})))
            .mount(&server)
            .await;
        let (state, _shutdown) = state_for(&server, Duration::from_millis(10));

        let response = router(Arc::clone(&state))
            .oneshot(call_request("%2B17701234567", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["status"], "Error: busy");

        let store = state.store.read().await;
        assert!(store.refresh_due_at.is_none());
        assert_eq!(
            store.call,
            CallState::Failed {
                message: "Error: busy".into()
            }
        );
    }

    #[tokio::test]
    async fn successful_call_refreshes_once_after_delay() {
        let server = MockServer::start().await;
        mount_collections(&server).await;
        Mock::given(method("POST"))
            .and(path("/test-call"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"call_sid": "CA42"})))
            .expect(1)
            .mount(&server)
            .await;
        let (state, _shutdown) = state_for(&server, Duration::from_millis(250));

        let response = router(Arc::clone(&state))
            .oneshot(call_request("%2B17701234567", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "Call initiated! SID: CA42");
        assert!(state.store.read().await.refresh_due_at.is_some());
        assert!(state.store.read().await.is_loading());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let store = state.store.read().await;
        assert!(store.refresh_due_at.is_none());
        let snapshot = store.snapshot().expect("refresh should have loaded data");
        assert_eq!(snapshot.feedback[0].client_name, "Jennifer Park");
    }

    #[tokio::test]
    async fn abandoned_request_still_finishes_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/test-call"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"call_sid": "CA7"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        let (state, _shutdown) = state_for(&server, Duration::from_secs(30));
        let app = router(Arc::clone(&state));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            app.clone().oneshot(call_request("%2B15550001111", false)),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(state.store.read().await.call.is_submitting());

        tokio::time::sleep(Duration::from_secs(1)).await;
        {
            let store = state.store.read().await;
            assert_eq!(
                store.call,
                CallState::Succeeded {
                    call_sid: "CA7".into()
                }
            );
            assert!(store.refresh_due_at.is_some());
        }

        let response = app
            .oneshot(call_request("%2B15550001111", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn later_schedule_keeps_its_marker() {
        let server = MockServer::start().await;
        mount_collections(&server).await;
        let (state, _shutdown) = state_for(&server, Duration::from_millis(400));

        schedule_refresh(&state).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        schedule_refresh(&state).await;
        let second = state.store.read().await.refresh_due_at;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(state.store.read().await.refresh_due_at, second);
        assert!(state.store.read().await.snapshot().is_some());
    }

    #[tokio::test]
    async fn overlapping_reloads_keep_the_newest_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feedbacks/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": 1, "summary": "Before the call"}]))
                    .set_delay(Duration::from_millis(300)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feedbacks/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": 1, "summary": "After the call"}])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        let (state, _shutdown) = state_for(&server, Duration::from_secs(30));

        let earlier = tokio::spawn({
            let state = Arc::clone(&state);
            async move { reload(&state).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        reload(&state).await;
        earlier.await.unwrap();

        let store = state.store.read().await;
        let snapshot = store.snapshot().expect("reload should have loaded data");
        assert_eq!(snapshot.feedback[0].summary, "After the call");
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;
        let (state, shutdown) = state_for(&server, Duration::from_millis(100));

        schedule_refresh(&state).await;
        shutdown.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(matches!(state.store.read().await.load, LoadState::Loading));
    }

    #[tokio::test]
    async fn failed_reload_is_reported_as_failed_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (state, _shutdown) = state_for(&server, Duration::from_secs(30));

        reload(&state).await;
        assert!(matches!(state.store.read().await.load, LoadState::Failed { .. }));

        let response = router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(html.to_vec()).unwrap();
        assert!(html.contains("No feedback data available yet."));
    }

    #[tokio::test]
    async fn dashboard_json_exposes_store() {
        let server = MockServer::start().await;
        mount_collections(&server).await;
        let (state, _shutdown) = state_for(&server, Duration::from_secs(30));
        reload(&state).await;

        let response = router(state)
            .oneshot(Request::builder().uri("/api/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["load"]["state"], "loaded");
        assert_eq!(body["load"]["snapshot"]["agent_ratings"][0]["rating"], 9.0);
        assert_eq!(body["call"]["state"], "idle");
    }
}
