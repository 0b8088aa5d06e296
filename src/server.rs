//! HTTP serving of rendered feeds.
//!
//! - `GET /` lists every feed and podcast
//! - `GET /{name}` renders the named feed or podcast as `application/xml`
//! - `GET /{name}/audio/...` serves files from a podcast's audio directory
//!
//! Handlers only ever take read locks on the shared catalog, so renders run
//! in parallel. Anything that mutates the catalog in-process must take the
//! write lock, which keeps a rescan from racing an in-flight render.

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::catalog::Catalog;
use crate::feed::{render_feed, render_podcast, RenderError};

pub type SharedCatalog = Arc<RwLock<Catalog>>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: SharedCatalog,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("No feed or podcast named '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::NotFound(name) => {
                tracing::debug!(name = %name, "Feed not found");
                (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
            }
            ServerError::Render(e) => {
                tracing::error!(error = %e, "Failed to render feed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the router over the shared catalog.
///
/// Every path is resolved against the catalog per request, so podcast names
/// never become route templates and podcasts added later are served too.
pub fn router(catalog: SharedCatalog) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/{name}", get(serve_named))
        .route("/{name}/audio/{*path}", get(serve_audio))
        .with_state(AppState { catalog })
}

/// Serve the catalog on an already-bound listener until Ctrl-C.
pub async fn serve(listener: TcpListener, catalog: SharedCatalog) -> std::io::Result<()> {
    let app = router(catalog);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "Serving feeds");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// ============================================================================
// Handlers
// ============================================================================

async fn serve_named(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ServerError> {
    let catalog = state.catalog.read().await;

    // A name used for both wins as a feed.
    let xml = if let Ok(feed) = catalog.feed(&name) {
        render_feed(feed)?
    } else if let Ok(podcast) = catalog.podcast(&name) {
        render_podcast(podcast)?
    } else {
        return Err(ServerError::NotFound(name));
    };

    tracing::debug!(name = %name, bytes = xml.len(), "Rendered feed");
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

/// Hand the request to a `ServeDir` rooted at the podcast's audio directory,
/// with the URI cut down to the part after `/{name}/audio`.
async fn serve_audio(
    State(state): State<AppState>,
    Path((name, _file)): Path<(String, String)>,
    mut req: Request,
) -> Result<Response, ServerError> {
    let audio_dir = match state.catalog.read().await.podcast(&name) {
        Ok(podcast) => podcast.audio_dir.clone(),
        Err(_) => return Err(ServerError::NotFound(name)),
    };

    // The raw path keeps its percent-encoding, which ServeDir decodes itself.
    let file_uri = req
        .uri()
        .path()
        .splitn(4, '/')
        .nth(3)
        .and_then(|rest| format!("/{rest}").parse::<Uri>().ok());
    let Some(file_uri) = file_uri else {
        return Err(ServerError::NotFound(name));
    };
    *req.uri_mut() = file_uri;

    tracing::debug!(name = %name, path = %req.uri().path(), "Serving audio file");
    match ServeDir::new(audio_dir).oneshot(req).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}

async fn index(State(state): State<AppState>) -> String {
    let catalog = state.catalog.read().await;
    let mut body = String::new();

    let _ = writeln!(body, "Feeds:");
    for (name, feed) in catalog.feeds() {
        let _ = writeln!(body, "- /{name}: {} ({} items)", feed.title, feed.items.len());
    }
    let _ = writeln!(body, "Podcasts:");
    for (name, podcast) in catalog.podcasts() {
        let _ = writeln!(
            body,
            "- /{name}: {} ({} episodes)",
            podcast.title,
            podcast.episodes.len()
        );
    }
    body
}
