//! The panel's mounted endpoints.
//!
//! Handler constructors close over the shared [`Config`] and a
//! [`ShadowStore`] behind an `Arc`, and [`panel_router`] assembles the full
//! mount table: the shadow and auth API first, then `/` mapped onto
//! `index.html`, then the static catch-all.
//!
//! Auth responses use a `{state, msg}` JSON shape throughout. One asymmetry
//! is load-bearing: `GET /api/auth` reports an invalid session with HTTP 200,
//! while `POST /api/auth` rejects a bad token with 400. The panel frontend
//! distinguishes the two, so both codes stay as they are.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::http::respond;
use crate::router::{IntoHandler, PatternError, Router};
use crate::shadow::ShadowStore;
use crate::staticfiles::StaticDir;

fn state_ok() -> Value {
    json!({"state": "OK"})
}

fn state_error(msg: &str) -> Value {
    json!({"state": "ERROR", "msg": msg})
}

/// `GET /api/shadow` — fetch the device-shadow document and return it as
/// JSON.
pub fn get_shadow(config: &Config, store: &Arc<dyn ShadowStore>) -> impl IntoHandler {
    let thing = config.thing_name().to_owned();
    let store = Arc::clone(store);
    move |_ctx: Context| {
        let thing = thing.clone();
        let store = Arc::clone(&store);
        async move {
            let document = store.get(&thing).await?;
            Ok(respond(document).build())
        }
    }
}

/// `PUT /api/shadow` — submit the decoded request body as a shadow update and
/// return the refreshed document.
///
/// Requires a valid auth cookie; without one the update is refused with a
/// 400 `{state: "ERROR"}` body.
pub fn put_shadow(config: &Config, store: &Arc<dyn ShadowStore>) -> impl IntoHandler {
    let master_key = config.master_key().to_owned();
    let thing = config.thing_name().to_owned();
    let store = Arc::clone(store);
    move |ctx: Context| {
        let master_key = master_key.clone();
        let thing = thing.clone();
        let store = Arc::clone(&store);
        async move {
            if !ctx.cookies().check(&master_key) {
                return Ok(respond(state_error("missing auth cookie")).status(400).build());
            }

            let Some(patch) = ctx.body().as_structured() else {
                return Ok(respond(state_error("missing update body")).status(400).build());
            };

            debug!(thing = %thing, patch = %patch, "shadow update");
            store.update(&thing, patch.clone()).await?;
            let document = store.get(&thing).await?;
            Ok(respond(document).build())
        }
    }
}

/// `GET /api/auth` — report whether the presented cookie is valid.
///
/// A valid cookie is refreshed and `{state: "OK"}` returned; an invalid or
/// missing one gets `{state: "ERROR"}` — still with HTTP 200 (see the module
/// docs).
pub fn get_auth(config: &Config) -> impl IntoHandler {
    let master_key = config.master_key().to_owned();
    move |mut ctx: Context| {
        let master_key = master_key.clone();
        async move {
            if ctx.cookies().check(&master_key) {
                ctx.cookies_mut().add(&master_key);
                Ok(respond(state_ok()).cookies(ctx.cookies()).build())
            } else {
                Ok(respond(state_error("missing or invalid cookie")).build())
            }
        }
    }
}

/// `POST /api/auth` — log in.
///
/// A valid existing cookie is simply regenerated. Otherwise the decoded body
/// must carry an `access_token` field matching the configured secret; a match
/// mints a fresh cookie, anything else is a 400.
pub fn post_auth(config: &Config) -> impl IntoHandler {
    let master_key = config.master_key().to_owned();
    let access_token = config.access_token().to_owned();
    move |mut ctx: Context| {
        let master_key = master_key.clone();
        let access_token = access_token.clone();
        async move {
            if ctx.cookies().check(&master_key) {
                ctx.cookies_mut().add(&master_key);
                return Ok(respond(state_ok()).cookies(ctx.cookies()).build());
            }

            let presented = ctx
                .body()
                .as_structured()
                .and_then(|body| body.get("access_token"))
                .and_then(Value::as_str);

            match presented {
                Some(token) if token == access_token => {
                    ctx.cookies_mut().add(&master_key);
                    Ok(respond(state_ok()).cookies(ctx.cookies()).build())
                }
                Some(_) => Ok(respond(state_error("access_token incorrect"))
                    .status(400)
                    .build()),
                None => Ok(respond(state_error("missing access_token"))
                    .status(400)
                    .build()),
            }
        }
    }
}

/// Assembles the panel's full mount table.
///
/// Mount order is significant: the API routes claim their paths first, `/`
/// (exact) maps onto `index.html`, and the catch-all serves everything else
/// from the static directory.
///
/// # Errors
///
/// Returns [`PatternError`] if any of the built-in patterns fails to compile
/// (which would be a programming error caught by the tests).
pub fn panel_router(
    config: &Config,
    store: &Arc<dyn ShadowStore>,
    assets: &StaticDir,
) -> Result<Router, PatternError> {
    let mut router = Router::new();
    router.get("/api/shadow", get_shadow(config, store))?;
    router.put("/api/shadow", put_shadow(config, store))?;
    router.get("/api/auth", get_auth(config))?;
    router.post("/api/auth", post_auth(config))?;
    router.get("/$", assets.fixed("index.html"))?;
    router.get("/.*", assets.handler())?;
    Ok(router)
}
