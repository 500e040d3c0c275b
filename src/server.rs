//! HTTP presentation layer.
//!
//! Every route is a thin adapter over one [`Controller`] method and answers
//! with the resulting [`View`](crate::controller::View) as JSON, except the
//! page itself, raw image bytes and the SSE summary stream.
//!
//! | Method | Path | Controller |
//! |---|---|---|
//! | GET | `/` | single-page UI |
//! | GET | `/health` | liveness |
//! | GET / DELETE | `/api/session` | `view` / `reset` |
//! | POST | `/api/documents` | `upload` |
//! | GET | `/api/documents/{file_id}/images/{index}` | `image_bytes` |
//! | POST | `/api/summary` | `summarize` |
//! | GET | `/api/summary/stream` | `summarize_stream` |
//! | POST | `/api/images/{index}/analysis` | `analyze_image` |
//! | POST | `/api/analysis?mode=` | `analyze_all` |

use crate::config::DispatchMode;
use crate::controller::{Controller, View};
use crate::error::SummizeError;
use crate::session::FileId;
use crate::stream::SummaryEvent;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Header carrying the original file name of an upload.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// A [`SummizeError`] rendered as `{ "error": "…" }` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub SummizeError);

impl From<SummizeError> for ApiError {
    fn from(err: SummizeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SummizeError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SummizeError::MalformedDocument { .. } | SummizeError::DocumentUnavailable { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SummizeError::NoDocument | SummizeError::Superseded { .. } => StatusCode::CONFLICT,
            SummizeError::ImageOutOfRange { .. } | SummizeError::StaleFile { .. } => {
                StatusCode::NOT_FOUND
            }
            SummizeError::Configuration { .. }
            | SummizeError::InvalidConfig(_)
            | SummizeError::Io { .. }
            | SummizeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(detail = %self.0, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Build the application router.
pub fn router(controller: Controller) -> Router {
    let max_upload = controller.config().max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/session", get(session).delete(reset))
        .route("/api/documents", post(upload))
        .route("/api/documents/{file_id}/images/{index}", get(image))
        .route("/api/summary", post(summary))
        .route("/api/summary/stream", get(summary_stream))
        .route("/api/images/{index}/analysis", post(analyze_image))
        .route("/api/analysis", post(analyze_all))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(controller: Controller) -> Result<(), SummizeError> {
    let addr = controller.config().bind;
    let listener = TcpListener::bind(addr).await.map_err(|e| SummizeError::Io {
        path: addr.to_string(),
        source: e,
    })?;
    let local = listener.local_addr().map_err(|e| SummizeError::Io {
        path: addr.to_string(),
        source: e,
    })?;
    info!("Serving on http://{local}/");

    axum::serve(listener, router(controller))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| SummizeError::Io {
            path: local.to_string(),
            source: e,
        })
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(controller): State<Controller>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": controller.view().model,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn session(State(controller): State<Controller>) -> Json<View> {
    Json(controller.view())
}

async fn reset(State(controller): State<Controller>) -> Json<View> {
    Json(controller.reset())
}

async fn upload(
    State(controller): State<Controller>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<View>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let view = controller.upload(name, content_type, body.to_vec()).await?;
    Ok(Json(view))
}

async fn image(
    State(controller): State<Controller>,
    Path((file_id, index)): Path<(String, usize)>,
) -> ApiResult<Response> {
    let file_id: FileId = file_id
        .parse()
        .map_err(|_| SummizeError::StaleFile { file_id: file_id.clone() })?;
    let (bytes, mime) = controller.image_bytes(&file_id, index)?;
    Ok(([(header::CONTENT_TYPE, mime)], bytes).into_response())
}

async fn summary(State(controller): State<Controller>) -> ApiResult<Json<View>> {
    Ok(Json(controller.summarize().await?))
}

fn sse_event(event: &SummaryEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

async fn summary_stream(
    State(controller): State<Controller>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let events = controller.summarize_stream()?;
    let stream = events.map(|event| Ok::<_, Infallible>(sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn analyze_image(
    State(controller): State<Controller>,
    Path(index): Path<usize>,
) -> ApiResult<Json<View>> {
    Ok(Json(controller.analyze_image(index).await?))
}

#[derive(Debug, Deserialize)]
struct AnalysisParams {
    mode: Option<DispatchMode>,
}

async fn analyze_all(
    State(controller): State<Controller>,
    Query(params): Query<AnalysisParams>,
) -> ApiResult<Json<View>> {
    Ok(Json(controller.analyze_all(params.mode).await?))
}
