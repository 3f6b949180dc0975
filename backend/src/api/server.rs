//! HTTP Server for the makerdir pipeline.
//!
//! Runs the stages on request and streams their progress over SSE. One stage
//! runs at a time; a request arriving while another stage runs gets 409.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//! | POST   | `/api/split`      | Run the split stage                  |
//! | POST   | `/api/compress`   | Run the compress stage               |
//! | POST   | `/api/upload`     | Run the upload stage                 |

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, log_warning, LOG_BROADCASTER};
use super::types::{error_response, CompressRequest, SplitSummary, Stage, StageResponse, UploadRequest};
use crate::config::Config;
use crate::error::{PublishError, ServerError};
use crate::planner::run_split;
use crate::publish::{publish, publish_dry_run, PublishReport};
use crate::transform::{compress, CompressOptions, CompressReport};

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Busy => StatusCode::CONFLICT,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Publish(PublishError::NoSourceDirs(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log_error(self.to_string());
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/logs", get(sse_logs))
        .route("/api/split", post(split))
        .route("/api/compress", post(compress_stage))
        .route("/api/upload", post(upload))
        .with_state(state)
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(config: Config, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Makerdir server running on http://localhost:{}", port);
    println!("   POST /api/split    - Split images by spec document");
    println!("   POST /api/compress - Resize and recompress SMALL folders");
    println!("   POST /api/upload   - Upload to FTP and sync catalog");
    println!("   GET  /api/logs     - SSE log stream");
    println!("   GET  /health       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "makerdir",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "split": "POST /api/split",
            "compress": "POST /api/compress",
            "upload": "POST /api/upload",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Empty body means defaults.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ServerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn join_error(e: tokio::task::JoinError) -> ServerError {
    ServerError::Internal(e.to_string())
}

fn log_finished(stage: Stage, warnings: &[String]) {
    if warnings.is_empty() {
        log_success(format!("{:?} finished", stage));
    } else {
        log_warning(format!("{:?} finished with {} warning(s)", stage, warnings.len()));
    }
}

async fn split(State(state): State<AppState>) -> Result<Json<StageResponse<SplitSummary>>, ServerError> {
    let _guard = state.run_lock.try_lock().map_err(|_| ServerError::Busy)?;
    log_info("✂️  Split requested");

    let config = state.config.clone();
    let outcome = tokio::task::spawn_blocking(move || run_split(&config, &*LOG_BROADCASTER))
        .await
        .map_err(join_error)??;

    let warnings: Vec<String> = outcome.warnings.iter().map(ToString::to_string).collect();
    log_finished(Stage::Split, &warnings);
    Ok(Json(StageResponse::new(Stage::Split, SplitSummary::from(&outcome), warnings)))
}

async fn compress_stage(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StageResponse<CompressReport>>, ServerError> {
    let request: CompressRequest = parse_body(&body)?;
    let _guard = state.run_lock.try_lock().map_err(|_| ServerError::Busy)?;
    log_info("🗜️  Compress requested");

    let mut options = CompressOptions::from_config(&state.config);
    options.width = request.width.unwrap_or(options.width);
    options.height = request.height.unwrap_or(options.height);
    options.quality = request.quality.filter(|q| *q > 0).unwrap_or(options.quality);

    let report = tokio::task::spawn_blocking(move || compress(&request.dirs, &options, &*LOG_BROADCASTER))
        .await
        .map_err(join_error)?;

    let warnings: Vec<String> = report
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.path.display(), f.message))
        .chain(report.skipped_dirs.iter().map(|d| format!("{}: unreadable", d.display())))
        .collect();
    log_finished(Stage::Compress, &warnings);
    Ok(Json(StageResponse::new(Stage::Compress, report, warnings)))
}

async fn upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StageResponse<PublishReport>>, ServerError> {
    let request: UploadRequest = parse_body(&body)?;
    let _guard = state.run_lock.try_lock().map_err(|_| ServerError::Busy)?;
    log_info("📤 Upload requested");

    // FTP is blocking; keep it off the async workers
    let config = state.config.clone();
    let handle = tokio::runtime::Handle::current();
    let report = tokio::task::spawn_blocking(move || {
        let sink = &*LOG_BROADCASTER;
        if request.dry_run {
            handle.block_on(publish_dry_run(&config, sink))
        } else {
            handle.block_on(publish(&config, sink))
        }
    })
    .await
    .map_err(join_error)??;

    let warnings: Vec<String> = report
        .warnings
        .iter()
        .cloned()
        .chain(report.failures.iter().map(|f| format!("{}: {}", f.path.display(), f.message)))
        .collect();
    log_finished(Stage::Upload, &warnings);
    Ok(Json(StageResponse::new(Stage::Upload, report, warnings)))
}
