use std::{future::Future, io, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode, Uri, header::CONTENT_TYPE},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
};
use jobrun_core::{TaskContext, TaskOutput, TaskRequest, TaskRouter};
use jobrun_model::ConfigStore;
use jobrun_prometheus::RequestMetrics;
use tokio::{net::TcpListener, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::ApiError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const UNMATCHED: &str = "unmatched";
const INDEX_PAGE: &str = include_str!("index.html");

struct AppState {
    config: Arc<ConfigStore>,
    tasks: TaskRouter,
    metrics: RequestMetrics,
}

/// HTTP surface of the agent.
pub struct HttpApi {
    state: Arc<AppState>,
}

impl HttpApi {
    pub fn new(config: Arc<ConfigStore>, tasks: TaskRouter, metrics: RequestMetrics) -> Self {
        Self {
            state: Arc::new(AppState {
                config,
                tasks,
                metrics,
            }),
        }
    }

    /// Build the axum router.
    ///
    /// Routes:
    /// - every registered task route - task dispatch (any method; tasks decide)
    /// - GET /metrics - request counters and latency histogram
    /// - GET /health - liveness
    /// - GET /config - active configuration as JSON
    /// - GET|POST /reload - re-read the configuration file
    /// - GET / - usage page
    pub fn router(self) -> Router {
        let mut router = Router::new();
        for route in self.state.tasks.routes() {
            router = router.route(route, any(dispatch));
        }

        router
            .route("/metrics", get(app_metrics))
            .route("/health", get(health))
            .route("/config", get(show_config))
            .route("/reload", get(reload).post(reload))
            .route("/", get(index))
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.state),
                track_requests,
            ))
            .with_state(self.state)
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

/// Records `http_requests_total` / `http_request_duration_seconds` for every response.
async fn track_requests(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let handler = req
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED, MatchedPath::as_str)
        .to_string();

    let response = next.run(req).await;
    state.metrics.observe(
        response.status().as_u16(),
        &handler,
        method.as_str(),
        started.elapsed(),
    );
    response
}

/// Run the task registered for the request path against a config snapshot.
///
/// The task context is canceled when the request future is dropped, which
/// happens when the client goes away.
async fn dispatch(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Response {
    let cfg = state.config.snapshot();
    let req = TaskRequest::from_query(method, uri.path(), uri.query());

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let ctx = TaskContext::from_token(cancel);

    let span = info_span!("task", request_id = %Uuid::new_v4(), path = req.path());
    let out = state.tasks.dispatch(&ctx, &req, &cfg).instrument(span).await;
    render(&req, out)
}

fn render(req: &TaskRequest, out: TaskOutput) -> Response {
    if let Some(err) = &out.error {
        error!(
            path = req.path(),
            method = %req.method(),
            status_code = out.status.as_u16(),
            error = %err,
            "task handler error"
        );
        if out.body.is_empty() {
            return (out.status, format!("Task execution failed: {err}\n")).into_response();
        }
    }
    (out.status, [(CONTENT_TYPE, TEXT_PLAIN)], out.body).into_response()
}

async fn app_metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {e}")))?;
    Ok(([(CONTENT_TYPE, state.metrics.content_type())], body).into_response())
}

async fn health() -> &'static str {
    "OK\n"
}

async fn show_config(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let cfg = state.config.snapshot();
    let body = serde_json::to_string_pretty(&*cfg)
        .map_err(|e| ApiError::Internal(format!("failed to marshal config to JSON: {e}")))?;
    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

async fn reload(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    match state.config.reload() {
        Ok(_) => {
            info!(file = ?state.config.path(), "configuration reloaded");
            Ok("Configuration reloaded successfully.\n")
        }
        Err(err) => {
            let err = ApiError::from(err);
            match &err {
                ApiError::ReloadUnsupported => {
                    warn!("config reload requested, but no config file was given at startup")
                }
                other => error!(file = ?state.config.path(), error = %other, "config reload failed"),
            }
            Err(err)
        }
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn not_found(uri: Uri) -> (StatusCode, &'static str) {
    debug!(path = uri.path(), "no route");
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
