//! Request routing — map path patterns and HTTP methods to handler functions.
//!
//! This module provides [`Router`], which dispatches one inbound envelope per
//! invocation to the first mount whose method and pattern both match. Patterns
//! are regular expressions compiled to match from the start of the path:
//!
//! | Pattern              | Matches                          |
//! |----------------------|----------------------------------|
//! | `/api/shadow`        | `/api/shadow`, `/api/shadowing`  |
//! | `/devices/(?P<id>\w+)` | `/devices/ac1` with `id → "ac1"` |
//! | `/.*`                | every path                       |
//!
//! Mounts are matched in registration order; the first mount whose method and
//! pattern both match wins, unconditionally. Overlapping patterns are not
//! rejected — order resolves them.
//!
//! [`Router::handle`] never fails: an unmatched path falls through to the
//! default 404 route, and any handler error is mapped to the 500 route, so
//! every invocation resolves to exactly one well-formed envelope.

use std::pin::Pin;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, error};

use crate::context::{Context, PathParams};
use crate::http::{HttpEvent, HttpResponse, Method, respond};
use crate::shadow::ShadowError;

/// Errors a handler can surface. The router maps every variant to the same
/// 500 route; the variants exist so callers between the failure point and the
/// router can still match on the cause.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("shadow store failure: {0}")]
    Shadow(#[from] ShadowError),

    #[error("serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// What every handler returns.
pub type HandlerResult = Result<HttpResponse, HandlerError>;

/// Type-erased, heap-allocated async handler that processes a [`Context`] and
/// returns a [`HandlerResult`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be cloned and
/// shared without copying the underlying closure. You never construct this
/// type directly — use [`Router::mount`] and the method-specific helpers.
pub type Handler = Arc<
    dyn Fn(Context) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>> + Send + Sync + 'static,
>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = HandlerResult> + Send` that is
/// also `Send + Sync + 'static` implements this trait automatically via the
/// blanket impl below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>> {
        Box::pin((self)(ctx))
    }
}

/// A mount pattern that failed to compile.
#[derive(Debug, Error)]
#[error("invalid mount pattern: {0}")]
pub struct PatternError(#[from] regex::Error);

// Which methods a mount accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    fn accepts(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(m) => m == method,
        }
    }
}

// A single registered mount binding a method filter + pattern to a handler.
// Immutable once added; ordering in the mount table is significant.
struct Mount {
    filter: MethodFilter,
    pattern: Regex,
    handler: Handler,
}

/// Dispatches inbound envelopes to registered handler functions.
///
/// The mount table is built once before serving begins and only read
/// afterwards, so dispatch needs no locking. Matching is a linear scan in
/// insertion order — fine for the handful of mounts this serves; a larger
/// table would want an indexed structure.
///
/// # Examples
///
/// ```
/// use routelet::{Context, Router, respond};
///
/// let mut router = Router::new();
/// router.get("/ping", |_ctx| async { Ok(respond("pong").build()) }).unwrap();
/// router.mount("/.*", |ctx: Context| async move {
///     Ok(respond(format!("fallback for {}", ctx.path())).build())
/// }).unwrap();
/// ```
pub struct Router {
    mounts: Vec<Mount>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a new, empty `Router` with no registered mounts.
    pub fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    /// Registers a handler for every method matching `pattern`.
    ///
    /// The pattern is compiled to match from the start of the path (it is not
    /// anchored at the end). Mounts are consulted in registration order and
    /// the first match wins; overlap between patterns is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regular
    /// expression.
    pub fn mount(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<(), PatternError> {
        self.add_mount(MethodFilter::Any, pattern, handler)
    }

    /// Registers a handler for `GET` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regular
    /// expression.
    pub fn get(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<(), PatternError> {
        self.add_mount(MethodFilter::Only(Method::Get), pattern, handler)
    }

    /// Registers a handler for `POST` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regular
    /// expression.
    pub fn post(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<(), PatternError> {
        self.add_mount(MethodFilter::Only(Method::Post), pattern, handler)
    }

    /// Registers a handler for `PUT` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regular
    /// expression.
    pub fn put(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<(), PatternError> {
        self.add_mount(MethodFilter::Only(Method::Put), pattern, handler)
    }

    /// Registers a handler for `DELETE` requests matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regular
    /// expression.
    pub fn delete(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<(), PatternError> {
        self.add_mount(MethodFilter::Only(Method::Delete), pattern, handler)
    }

    // Compile anchored-at-start and erase the concrete handler type.
    fn add_mount(
        &mut self,
        filter: MethodFilter,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<(), PatternError> {
        let pattern = Regex::new(&format!("^(?:{pattern})"))?;
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.mounts.push(Mount {
            filter,
            pattern,
            handler,
        });
        Ok(())
    }

    /// Returns the number of registered mounts.
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Returns `true` if no mounts have been registered.
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Dispatches one inbound envelope and returns its response envelope.
    ///
    /// Mounts are tested in registration order; the first whose method filter
    /// and pattern both match wins, its captures are recorded into the
    /// context, and its handler runs. No match falls through to the default
    /// 404 route. A handler error (or an envelope whose body contradicts its
    /// own declarations) is logged in full and mapped to the 500 route with a
    /// short description — this method never fails.
    pub async fn handle(&self, event: HttpEvent) -> HttpResponse {
        debug!(
            event = %serde_json::to_string(&event).unwrap_or_else(|_| "<unserializable>".into()),
            "inbound envelope"
        );

        let mut ctx = match Context::from_event(&event) {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(path = %event.path(), error = %e, "failed to normalize envelope");
                return error_route(&e.to_string());
            }
        };

        let Some(mount) = self.find_mount(&mut ctx) else {
            return default_route(ctx.path());
        };

        match (mount.handler)(ctx).await {
            Ok(response) => response,
            Err(e) => {
                error!(path = %event.path(), error = %e, "handler failure");
                error_route(&e.to_string())
            }
        }
    }

    // First mount whose filter and pattern both accept the request; records
    // the winning captures into the context.
    fn find_mount(&self, ctx: &mut Context) -> Option<&Mount> {
        for mount in &self.mounts {
            if !mount.filter.accepts(ctx.method()) {
                continue;
            }
            if let Some(captures) = mount.pattern.captures(ctx.path()) {
                ctx.set_params(PathParams::from_captures(&mount.pattern, &captures));
                return Some(mount);
            }
        }
        None
    }
}

// 404 for a path no mount claims.
fn default_route(path: &str) -> HttpResponse {
    respond(format!("couldn't find a route for {path}"))
        .status(404)
        .build()
}

// 500 with a short description; the full failure is already logged.
fn error_route(message: &str) -> HttpResponse {
    respond(format!("request failed: {message}"))
        .status(500)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: Method, path: &str) -> HttpEvent {
        HttpEvent::new(method, path)
    }

    fn ok(body: &str) -> HandlerResult {
        Ok(respond(body).build())
    }

    #[test]
    fn router_starts_empty() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut router = Router::new();
        let result = router.mount("/(unclosed", |_ctx| async { ok("never") });
        assert!(result.is_err());
        assert!(router.is_empty());
    }

    #[tokio::test]
    async fn empty_router_returns_404() {
        let router = Router::new();
        let res = router.handle(event(Method::Get, "/nope")).await;
        assert_eq!(res.status(), 404);
        assert!(res.body().contains("/nope"));
        assert_eq!(res.description(), "OK");
    }

    #[tokio::test]
    async fn first_match_wins_over_later_mounts() {
        let mut router = Router::new();
        router.get("/a.*", |_ctx| async { ok("first") }).unwrap();
        router.mount("/ab", |_ctx| async { ok("second") }).unwrap();

        let res = router.handle(event(Method::Get, "/ab")).await;
        assert_eq!(res.body(), "first");
    }

    #[tokio::test]
    async fn method_filter_skips_non_matching_mounts() {
        let mut router = Router::new();
        router.post("/thing", |_ctx| async { ok("posted") }).unwrap();
        router.mount("/thing", |_ctx| async { ok("any") }).unwrap();

        let res = router.handle(event(Method::Get, "/thing")).await;
        assert_eq!(res.body(), "any");

        let res = router.handle(event(Method::Post, "/thing")).await;
        assert_eq!(res.body(), "posted");
    }

    #[tokio::test]
    async fn patterns_match_from_path_start_only() {
        let mut router = Router::new();
        router.get("/api", |_ctx| async { ok("api") }).unwrap();

        let res = router.handle(event(Method::Get, "/prefix/api")).await;
        assert_eq!(res.status(), 404);
    }

    #[tokio::test]
    async fn prefix_match_is_enough() {
        // No end anchor: "/api" also claims "/api/anything".
        let mut router = Router::new();
        router.get("/api", |_ctx| async { ok("api") }).unwrap();

        let res = router.handle(event(Method::Get, "/api/anything")).await;
        assert_eq!(res.body(), "api");
    }

    #[tokio::test]
    async fn captures_reach_the_handler() {
        let mut router = Router::new();
        router
            .get(r"/devices/(?P<id>\w+)", |ctx: Context| async move {
                let id = ctx.params().get("id").unwrap_or("unknown").to_owned();
                ok(&id)
            })
            .unwrap();

        let res = router.handle(event(Method::Get, "/devices/ac1")).await;
        assert_eq!(res.body(), "ac1");
    }

    #[tokio::test]
    async fn handler_error_maps_to_500() {
        let mut router = Router::new();
        router
            .get("/boom", |_ctx| async {
                Err(HandlerError::Other("kaboom".to_owned()))
            })
            .unwrap();

        let res = router.handle(event(Method::Get, "/boom")).await;
        assert_eq!(res.status(), 500);
        assert!(res.body().contains("kaboom"));
        assert_eq!(res.description(), "OK");
    }

    #[tokio::test]
    async fn bad_envelope_maps_to_500() {
        let mut router = Router::new();
        router.mount("/.*", |_ctx| async { ok("reached") }).unwrap();

        let bad: HttpEvent = serde_json::from_str(
            r#"{"method": "POST", "path": "/x", "body": "not base64!", "isBase64Encoded": true}"#,
        )
        .unwrap();
        let res = router.handle(bad).await;
        assert_eq!(res.status(), 500);
    }

    #[tokio::test]
    async fn catch_all_sees_every_path() {
        let mut router = Router::new();
        router.mount("/.*", |ctx: Context| async move { ok(ctx.path()) }).unwrap();

        for path in ["/", "/deep/nested/path", "/file.css"] {
            let res = router.handle(event(Method::Get, path)).await;
            assert_eq!(res.body(), path);
        }
    }
}
