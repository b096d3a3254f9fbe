//! pergamo-qs library - Question Service
//!
//! Aggregates ENEM question folders, filters them by subject, serves cached
//! pages, and hosts practice sessions, explanations and question reports.

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub mod api;
pub mod classify;
pub mod error;
pub mod explain;
pub mod feed;
pub mod limits;
pub mod models;
pub mod report;
pub mod service;
pub mod session;
pub mod store;

use explain::ExplanationProvider;
use limits::ClientRateLimiter;
use report::ReportService;
use service::QuestionService;
use session::SessionRegistry;

/// Static asset mount for question images
#[derive(Debug, Clone)]
pub struct AssetMount {
    /// URL prefix, empty to serve from `/`
    pub prefix: String,
    pub root: PathBuf,
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub questions: Arc<QuestionService>,
    pub sessions: Arc<SessionRegistry>,
    pub explainer: Arc<dyn ExplanationProvider>,
    pub explain_limiter: Arc<ClientRateLimiter>,
    pub reports: Arc<ReportService>,
    pub assets: Option<AssetMount>,
    /// Whether `POST /questions/reload` may rescan the store
    pub allow_reload: bool,
}

impl AppState {
    pub fn new(
        questions: QuestionService,
        explainer: Arc<dyn ExplanationProvider>,
        explain_requests_per_minute: u32,
        reports: ReportService,
    ) -> Self {
        Self {
            questions: Arc::new(questions),
            sessions: Arc::new(SessionRegistry::new()),
            explainer,
            explain_limiter: Arc::new(ClientRateLimiter::per_minute(explain_requests_per_minute)),
            reports: Arc::new(reports),
            assets: None,
            allow_reload: false,
        }
    }

    pub fn with_assets(mut self, assets: Option<AssetMount>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }

    pub fn with_reload(mut self, allow_reload: bool) -> Self {
        self.allow_reload = allow_reload;
        self
    }
}

/// Periodically expire idle sessions and prune rate limiter state
///
/// Periods under one millisecond are raised to one millisecond.
pub fn spawn_maintenance(state: &AppState, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_millis(1));
    let sessions = Arc::clone(&state.sessions);
    let explain_limiter = Arc::clone(&state.explain_limiter);
    let reports = Arc::clone(&state.reports);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = sessions.sweep().await;
            explain_limiter.retain_recent();
            reports.retain_recent();
            debug!(
                "Maintenance sweep: {} sessions expired, {} explain clients tracked",
                expired,
                explain_limiter.len()
            );
        }
    })
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let questions = Router::new()
        .route("/questions/batch", post(api::questions_batch))
        .route("/questions/feed", post(api::questions_feed))
        .route("/questions/reload", post(api::reload_questions))
        .route("/questions/disciplines", get(api::list_disciplines))
        .route("/questions/years", get(api::list_years))
        .route("/questions/areas", get(api::list_areas))
        .route("/questions/:subject", get(api::questions_by_subject))
        .route("/questions/:subject/:year", get(api::questions_by_year));

    let sessions = Router::new()
        .route("/sessions", post(api::create_session))
        .route(
            "/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/sessions/:id/next", get(api::next_questions))
        .route("/sessions/:id/answer", post(api::answer_question))
        .route("/sessions/:id/skip", post(api::skip_question))
        .route("/sessions/:id/restart", post(api::restart_session));

    let assets = state.assets.clone();

    let mut router = Router::new()
        .merge(questions)
        .merge(sessions)
        .route("/explain", post(api::explain))
        .route("/report-question", post(api::report_question))
        .merge(api::health_routes());

    if let Some(mount) = assets {
        let serve = ServeDir::new(&mount.root);
        let prefix = mount.prefix.trim_matches('/');
        router = if prefix.is_empty() {
            router.fallback_service(serve)
        } else {
            router.nest_service(&format!("/{}", prefix), serve)
        };
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
