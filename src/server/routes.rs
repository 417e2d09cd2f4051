//! HTTP routes
//!
//! - `GET /events?id=<user>`: SSE stream for one user
//! - `POST /post?projectid=<project>` with form field `message`: publish
//! - `GET /stats`: relay counters
//! - `GET /`: optional index page
//!
//! Every route carries permissive CORS headers and answers `OPTIONS` with an
//! empty 200.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use super::error::ApiError;
use super::state::AppState;
use crate::ids::ProjectId;
use crate::publish::PublishOutcome;
use crate::session::{EventSink, StreamSession};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishQuery {
    pub projectid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishForm {
    #[serde(default)]
    pub message: String,
}

/// Build the axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/events", get(events))
        .route("/post", post(publish))
        .route("/stats", get(stats))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// GET /events?id=USER
/// Registers the user and streams every message routed to it.
async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Response, ApiError> {
    let mut session = StreamSession::new(
        state.registry.clone(),
        state.stats.clone(),
        state.session.clone(),
    );
    let user_id = session.connect(query.id.as_deref())?;

    let (sink, frames) = EventSink::channel(state.session.sink_capacity);
    let cancel = state.shutdown.child_token();

    tokio::spawn(async move {
        let reason = session.run(sink, cancel).await;
        tracing::debug!(user_id = %user_id, reason = ?reason, "Stream task finished");
    });

    let body = Body::from_stream(ReceiverStream::new(frames).map(Ok::<_, Infallible>));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response())
}

/// POST /post?projectid=PROJECT
/// Publishes the form's `message` to the project's connected subscribers.
async fn publish(
    State(state): State<AppState>,
    Query(query): Query<PublishQuery>,
    form: Option<Form<PublishForm>>,
) -> Result<StatusCode, ApiError> {
    let raw = query
        .projectid
        .ok_or(ApiError::MissingParameter("projectid"))?;
    let project_id = raw
        .parse::<ProjectId>()
        .map_err(|source| ApiError::InvalidParameter {
            param: "projectid",
            source,
        })?;

    let message = form.map(|Form(form)| form.message).unwrap_or_default();

    match state.publisher.publish(project_id, message).await {
        PublishOutcome::UnknownProject(_) => {
            tracing::info!(project_id = %project_id, "Publish to unknown project");
        }
        PublishOutcome::Published(report) => {
            tracing::info!(
                project_id = %project_id,
                delivered = report.delivered.len(),
                offline = report.offline.len(),
                dropped = report.dropped.len(),
                "Message published"
            );
        }
    }

    Ok(StatusCode::OK)
}

/// GET /stats
async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stats.snapshot(state.registry.len()))
}

/// GET /
async fn index(State(state): State<AppState>) -> Response {
    let Some(path) = state.index_file.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(path.as_path()).await {
        Ok(contents) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            contents,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read index file");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Add CORS headers to every response; answer preflight requests directly.
///
/// Any `OPTIONS` request gets an empty 200, including one without
/// `Origin`/`Access-Control-Request-Method`. `tower_http::cors::CorsLayer`
/// only short-circuits real preflights and would route a bare `OPTIONS` to a
/// 405, so this stays a `from_fn` middleware.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );

    response
}
