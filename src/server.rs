//! HTTP layer.
//!
//! ## Routes
//!
//! - `GET /map/<name>`: streams the latest file of save `<name>`.
//! - `GET /map`: HTML index of every save, linking to `<base_url>/map/<name>`.
//! - `OPTIONS` anywhere: CORS preflight, answered with `204 No Content`.
//!
//! Every response, errors included, carries the CORS headers the browser-based
//! map tool needs. Errors are JSON: `{"error": {"status": 404, "message": "..."}}`.
//!
//! ## Freshness and timeouts
//!
//! Each request asks the [`CatalogCache`] for a snapshot, so with the default
//! zero TTL the directory is listed after the request arrived. Resolving the
//! catalog and opening the file share one deadline (`request_timeout_secs`);
//! once the body is streaming, each chunk read gets the same deadline and a
//! stalled read aborts the body. A slow request never holds anything another
//! request waits on.

use crate::cache::CatalogCache;
use crate::config::{self, ConfigError, ServerConfig};
use crate::naming::SatisfactoryNaming;
use crate::render::{IndexLinks, render_index};
use crate::scan::{ScanError, Scanner};
use crate::types::SaveRecord;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use maud::Markup;
use serde_json::json;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

/// Startup failures.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Per-request failures, rendered as JSON error responses.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),
}

impl MapError {
    pub fn status(&self) -> StatusCode {
        match self {
            MapError::NotFound(_) => StatusCode::NOT_FOUND,
            MapError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MapError::Scan(_) | MapError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            MapError::TimedOut(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for MapError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), %message, "request failed");
        } else {
            info!(status = status.as_u16(), %message, "request rejected");
        }
        let body = json!({ "error": { "status": status.as_u16(), "message": message } });
        (status, Json(body)).into_response()
    }
}

/// CORS headers added to every response.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_credentials: bool,
}

impl CorsHeaders {
    pub fn from_config(config: &config::CorsConfig) -> Result<Self, ConfigError> {
        let allow_origin = HeaderValue::from_str(&config.allow_origin).map_err(|e| {
            ConfigError::Validation(format!("http.cors.allow_origin: {e}"))
        })?;
        Ok(Self {
            allow_origin,
            allow_credentials: config.allow_credentials,
        })
    }
}

/// Everything a handler needs. Built once at startup from the config.
pub struct AppState {
    cache: CatalogCache,
    links: IndexLinks,
    cors: CorsHeaders,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(
        cache: CatalogCache,
        links: IndexLinks,
        cors: CorsHeaders,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            links,
            cors,
            request_timeout,
        }
    }

    /// Validate the config, check the save directory, and wire the components.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        config::check_save_dir(&config.save_dir)?;

        let parser = Arc::new(SatisfactoryNaming::new(&config.saves.extensions));
        let scanner = Scanner::new(&config.save_dir, parser, config.saves.version_policy);
        Ok(Self::new(
            CatalogCache::new(scanner, config.cache_ttl()),
            IndexLinks::from_config(config)?,
            CorsHeaders::from_config(&config.http.cors)?,
            config.request_timeout(),
        ))
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = Arc::new(state.cors.clone());
    Router::new()
        .route("/map", get(index).options(preflight))
        .route("/map/:name", get(serve_save).options(preflight))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(cors, apply_cors))
        .with_state(state)
}

/// Bind, serve until Ctrl-C, then drain in-flight requests.
pub async fn run(config: ServerConfig) -> Result<(), ServeError> {
    let state = Arc::new(AppState::from_config(&config)?);

    let initial = state.cache.snapshot().await?;
    info!(
        save_dir = %config.save_dir.display(),
        saves = initial.catalog().len(),
        "initial scan complete"
    );

    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;

    info!("Server starting with configuration:");
    info!("  Save directory: {}", config.save_dir.display());
    info!("  Base URL: {}", config.base_url);
    info!("  Listening on: {addr}");
    info!("  Cache window: {:?}", config.cache_ttl());
    info!("Endpoints available:");
    info!("  - /map           : Lists all saves");
    info!("  - /map/<name>    : Serves the latest save file");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

// ============================================================================
// Handlers
// ============================================================================

async fn index(State(state): State<Arc<AppState>>) -> Result<Markup, MapError> {
    let timeout = state.request_timeout;
    let snapshot = tokio::time::timeout(timeout, state.cache.snapshot())
        .await
        .map_err(|_| MapError::TimedOut(timeout))??;
    Ok(render_index(snapshot.catalog(), &state.links))
}

async fn serve_save(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, MapError> {
    validate_name(&name)?;

    let timeout = state.request_timeout;
    let (record, file, stamp) = tokio::time::timeout(timeout, open_latest(&state, &name))
        .await
        .map_err(|_| MapError::TimedOut(timeout))??;

    info!(save = %name, path = %record.path.display(), bytes = stamp.len, "serving file");
    Ok(file_response(&record, file, stamp, timeout))
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    MapError::NotFound("no such route".into()).into_response()
}

async fn apply_cors(State(cors): State<Arc<CorsHeaders>>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        cors.allow_origin.clone(),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    if cors.allow_credentials {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
    response
}

// ============================================================================
// File streaming
// ============================================================================

/// Save names are single path segments. Dots inside a name are fine
/// (`ServerSettings.7777`); `.` and `..` on their own are not.
fn validate_name(name: &str) -> Result<(), MapError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(MapError::BadRequest(format!(
            "invalid save name {name:?}: must be a single path segment"
        )));
    }
    Ok(())
}

/// Length and mtime of the file as opened, not as scanned.
#[derive(Debug, Clone, Copy)]
struct FileStamp {
    len: u64,
    modified: DateTime<Utc>,
}

async fn open_latest(
    state: &AppState,
    name: &str,
) -> Result<(SaveRecord, File, FileStamp), MapError> {
    let snapshot = state.cache.snapshot().await?;
    let group = snapshot
        .catalog()
        .get(name)
        .ok_or_else(|| MapError::NotFound(format!("no save named {name:?}")))?;
    let record = group.latest.clone();

    let io_err = |source: io::Error| {
        // Rotated away between the scan and the open.
        if source.kind() == io::ErrorKind::NotFound {
            MapError::NotFound(format!("save {name:?} disappeared, retry"))
        } else {
            MapError::Io {
                path: record.path.clone(),
                source,
            }
        }
    };
    let file = File::open(&record.path).await.map_err(io_err)?;
    // The game may have rewritten the file since the scan; send what is there now.
    let metadata = file.metadata().await.map_err(io_err)?;
    let stamp = FileStamp {
        len: metadata.len(),
        modified: metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(record.modified_at),
    };
    Ok((record, file, stamp))
}

fn file_response<R>(record: &SaveRecord, reader: R, stamp: FileStamp, read_timeout: Duration) -> Response
where
    R: AsyncRead + Send + 'static,
{
    let path = record.path.clone();
    let stream = ReaderStream::new(reader)
        .timeout(read_timeout)
        .map(move |chunk| match chunk {
            Ok(read) => read,
            Err(_) => {
                warn!(path = %path.display(), "read stalled, aborting response");
                Err(io::Error::new(io::ErrorKind::TimedOut, "file read timed out"))
            }
        });

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&record.path)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stamp.len));
    let modified = stamp
        .modified
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    let filename = record.file_name().replace(['"', '\\'], "_");
    if let Ok(value) = HeaderValue::from_str(&format!("inline; filename=\"{filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Content type from the file extension. Saves are opaque binaries.
fn content_type_for(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => "application/json",
        "gz" => "application/gzip",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
