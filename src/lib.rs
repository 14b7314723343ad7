//! # routelet
//!
//! A minimal HTTP router and response builder for event-driven function
//! invocations: one inbound envelope per call, a first-match mount table, and
//! a normalized response envelope back — plus a signed-cookie session
//! primitive and static file serving for the panel frontend.
//!
//! ## Quick Start
//!
//! ```rust
//! use routelet::{HttpEvent, Method, Router, respond};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut router = Router::new();
//! router.get("/ping", |_ctx| async { Ok(respond("pong").build()) }).unwrap();
//!
//! let response = router.handle(HttpEvent::new(Method::Get, "/ping")).await;
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.body(), "pong");
//! # });
//! ```
//!
//! For the full panel — shadow document API, cookie auth, static assets —
//! see [`api::panel_router`].

pub mod api;
pub mod config;
pub mod context;
pub mod cookies;
pub mod http;
pub mod router;
pub mod shadow;
pub mod staticfiles;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::Config;
pub use context::{BodyData, Context};
pub use cookies::CookieJar;
pub use http::{Headers, HttpEvent, HttpResponse, Method, respond};
pub use router::{HandlerError, Router};
pub use shadow::{MemoryShadow, ShadowStore};
pub use staticfiles::StaticDir;
