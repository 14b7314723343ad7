//! Static file serving relative to a base directory.
//!
//! A [`StaticDir`] maps request paths onto files below a fixed base directory
//! and serves their bytes through the response builder, with the content type
//! guessed from the filename extension. Path segments that climb out of the
//! base directory are refused before any filesystem access.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::context::Context;
use crate::http::{HttpResponse, respond};
use crate::router::{HandlerResult, IntoHandler};

/// Serves files below a fixed base directory.
///
/// # Examples
///
/// ```no_run
/// use routelet::{Router, staticfiles::StaticDir};
///
/// let assets = StaticDir::new("static");
/// let mut router = Router::new();
/// router.get("/$", assets.fixed("index.html")).unwrap();
/// router.get("/.*", assets.handler()).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct StaticDir {
    base: PathBuf,
}

impl StaticDir {
    /// Creates a server rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Reads `relative` below the base directory and returns it as a
    /// response.
    ///
    /// Paths containing `..` segments (or absolute segments) are refused with
    /// an empty 404, as is a file that simply does not exist.
    ///
    /// # Errors
    ///
    /// Any I/O failure other than file-not-found propagates as a handler
    /// error.
    pub async fn serve(&self, relative: &str) -> HandlerResult {
        if !is_contained(Path::new(relative)) {
            warn!(path = %relative, "refusing path that escapes the base directory");
            return Ok(not_found());
        }

        let path = self.base.join(relative);
        debug!(path = %path.display(), "static request");

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(respond(bytes)
                .header("Content-Type", content_type(&path))
                .build()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns a mount handler serving the request path relative to the base
    /// directory (leading `/` stripped).
    pub fn handler(&self) -> impl IntoHandler {
        let dir = self.clone();
        move |ctx: Context| {
            let dir = dir.clone();
            async move { dir.serve(ctx.path().trim_start_matches('/')).await }
        }
    }

    /// Returns a mount handler that ignores the request path and always
    /// serves `filename` (used to map `/` onto `index.html`).
    pub fn fixed(&self, filename: impl Into<String>) -> impl IntoHandler {
        let dir = self.clone();
        let filename = filename.into();
        move |_ctx: Context| {
            let dir = dir.clone();
            let filename = filename.clone();
            async move { dir.serve(&filename).await }
        }
    }
}

fn not_found() -> HttpResponse {
    respond("").status(404).build()
}

// Only plain (or `.`) segments may touch the filesystem.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// Extension table. `.map` deliberately maps to application/json, matching the
// source-map files the panel ships.
fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" | "map" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "txt" => "text/plain",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
