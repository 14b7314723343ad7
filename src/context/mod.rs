//! Per-request context — the normalized, decoded view of an inbound envelope.
//!
//! [`Context`] is built once per invocation from an [`HttpEvent`]: the body is
//! base64-decoded when the envelope says so, then structured according to the
//! `content-type` header, and the cookie entries are parsed into a
//! [`CookieJar`]. The router fills in the path captures at match time;
//! everything else is read-only from the handler's point of view.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::cookies::CookieJar;
use crate::http::{Headers, HttpEvent, Method};

/// Errors that can occur while normalizing an inbound envelope.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("body declared base64 but does not decode: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("body declared application/json but does not parse: {0}")]
    Json(#[from] serde_json::Error),
}

/// A request body after decoding, as a tagged variant.
///
/// `Absent` (no body field in the envelope) is distinct from an empty body.
#[derive(Debug, Clone)]
pub enum BodyData {
    /// The envelope carried no body at all.
    Absent,
    /// Binary payload with no recognized content type.
    Raw(Bytes),
    /// Text payload with no recognized content type.
    Text(String),
    /// Decoded form or JSON payload.
    Structured(Value),
}

impl BodyData {
    /// Returns the structured value, if the body decoded to one.
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            BodyData::Structured(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` for [`BodyData::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, BodyData::Absent)
    }
}

/// Path captures recorded from the winning mount's pattern.
///
/// Group 0 is the whole match, as usual for regex captures; named groups are
/// also reachable by name.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl PathParams {
    /// Creates an empty capture set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the captures of a successful match.
    pub fn from_captures(pattern: &Regex, captures: &Captures<'_>) -> Self {
        let groups = (0..captures.len())
            .map(|i| captures.get(i).map(|m| m.as_str().to_owned()))
            .collect();
        let named = pattern
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_owned(), m.as_str().to_owned()))
            })
            .collect();
        Self { groups, named }
    }

    /// Returns a positional capture group (0 is the whole match).
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index)?.as_deref()
    }

    /// Returns a named capture group.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// The normalized request handed to handlers.
///
/// # Examples
///
/// ```
/// use routelet::context::{BodyData, Context};
/// use routelet::http::{HttpEvent, Method};
///
/// let event = HttpEvent::new(Method::Post, "/api/auth")
///     .with_header("content-type", "application/json")
///     .with_body(r#"{"access_token": "t"}"#);
///
/// let ctx = Context::from_event(&event).unwrap();
/// let body = ctx.body().as_structured().unwrap();
/// assert_eq!(body["access_token"], "t");
/// ```
#[derive(Debug)]
pub struct Context {
    method: Method,
    path: String,
    headers: Headers,
    raw_body: Option<String>,
    body: BodyData,
    cookies: CookieJar,
    params: PathParams,
}

impl Context {
    /// Normalizes an inbound envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] when the body contradicts its own declaration:
    /// base64 that does not decode, or JSON that does not parse.
    pub fn from_event(event: &HttpEvent) -> Result<Self, EventError> {
        let body = decode_body(event)?;
        Ok(Self {
            method: event.method().clone(),
            path: event.path().to_owned(),
            headers: event.headers().clone(),
            raw_body: event.body().map(str::to_owned),
            body,
            cookies: CookieJar::from_entries(event.cookies()),
            params: PathParams::new(),
        })
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the envelope headers (case-insensitive lookup).
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body string exactly as the envelope carried it.
    pub fn raw_body(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    /// Returns the decoded body.
    pub fn body(&self) -> &BodyData {
        &self.body
    }

    /// Returns the cookie jar built from the envelope's cookie entries.
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Returns the cookie jar mutably, for staging an outgoing cookie.
    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    /// Returns the captures recorded from the winning mount pattern.
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    // Called by the router once the winning mount is known.
    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }
}

// Decode per the envelope's own declarations: base64 flag first, then the
// content-type header decides the final shape.
fn decode_body(event: &HttpEvent) -> Result<BodyData, EventError> {
    let Some(raw) = event.body() else {
        return Ok(BodyData::Absent);
    };

    let bytes: Bytes = if event.is_base64_encoded() {
        Bytes::from(BASE64.decode(raw)?)
    } else {
        Bytes::copy_from_slice(raw.as_bytes())
    };

    let content_type = event
        .headers()
        .get("content-type")
        .unwrap_or("")
        .to_ascii_lowercase();

    match content_type.as_str() {
        "application/x-www-form-urlencoded" => Ok(BodyData::Structured(parse_form(&bytes))),
        "application/json" => Ok(BodyData::Structured(serde_json::from_slice(&bytes)?)),
        _ => {
            if event.is_base64_encoded() {
                Ok(BodyData::Raw(bytes))
            } else {
                Ok(BodyData::Text(raw.to_owned()))
            }
        }
    }
}

// Key/value decode with the single-value collapse rule: one value stays a
// scalar, repeats become an ordered array.
fn parse_form(bytes: &[u8]) -> Value {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(key.as_ref()) {
            None => {
                fields.insert(key.into_owned(), value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_body_is_absent() {
        let event = HttpEvent::new(Method::Get, "/");
        let ctx = Context::from_event(&event).unwrap();
        assert!(ctx.body().is_absent());
        assert!(ctx.raw_body().is_none());
    }

    #[test]
    fn plain_text_body() {
        let event = HttpEvent::new(Method::Post, "/").with_body("hello");
        let ctx = Context::from_event(&event).unwrap();
        assert!(matches!(ctx.body(), BodyData::Text(t) if t == "hello"));
        assert_eq!(ctx.raw_body(), Some("hello"));
    }

    #[test]
    fn empty_body_is_not_absent() {
        let event = HttpEvent::new(Method::Post, "/").with_body("");
        let ctx = Context::from_event(&event).unwrap();
        assert!(matches!(ctx.body(), BodyData::Text(t) if t.is_empty()));
    }

    #[test]
    fn base64_body_without_content_type_is_raw() {
        let event = HttpEvent::new(Method::Put, "/").with_binary_body(&[0, 1, 2, 255]);
        let ctx = Context::from_event(&event).unwrap();
        assert!(matches!(ctx.body(), BodyData::Raw(b) if b.as_ref() == [0, 1, 2, 255]));
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let event: HttpEvent = serde_json::from_str(
            r#"{"method": "PUT", "path": "/", "body": "!!!", "isBase64Encoded": true}"#,
        )
        .unwrap();
        assert!(matches!(
            Context::from_event(&event),
            Err(EventError::Base64(_))
        ));
    }

    #[test]
    fn json_body_is_structured() {
        let event = HttpEvent::new(Method::Post, "/")
            .with_header("Content-Type", "application/JSON")
            .with_body(r#"{"a": [1, 2]}"#);
        let ctx = Context::from_event(&event).unwrap();
        assert_eq!(ctx.body().as_structured(), Some(&json!({"a": [1, 2]})));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let event = HttpEvent::new(Method::Post, "/")
            .with_header("content-type", "application/json")
            .with_body("{not json");
        assert!(matches!(
            Context::from_event(&event),
            Err(EventError::Json(_))
        ));
    }

    #[test]
    fn form_body_collapses_single_values() {
        let event = HttpEvent::new(Method::Post, "/")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body("mode=cool&fan=low&fan=high");
        let ctx = Context::from_event(&event).unwrap();
        assert_eq!(
            ctx.body().as_structured(),
            Some(&json!({"mode": "cool", "fan": ["low", "high"]}))
        );
    }

    #[test]
    fn form_body_decodes_escapes() {
        let event = HttpEvent::new(Method::Post, "/")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body("note=a+b%26c");
        let ctx = Context::from_event(&event).unwrap();
        assert_eq!(ctx.body().as_structured(), Some(&json!({"note": "a b&c"})));
    }

    #[test]
    fn base64_form_body_decodes() {
        let event = HttpEvent::new(Method::Post, "/")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_binary_body(b"k=v");
        let ctx = Context::from_event(&event).unwrap();
        assert_eq!(ctx.body().as_structured(), Some(&json!({"k": "v"})));
    }

    #[test]
    fn cookies_are_parsed() {
        let event = HttpEvent::new(Method::Get, "/").with_cookie("theme=dark");
        let ctx = Context::from_event(&event).unwrap();
        assert_eq!(ctx.cookies().get("theme"), Some("dark"));
    }

    #[test]
    fn params_capture_groups() {
        let re = Regex::new(r"^/devices/(?P<id>\w+)/(.*)").unwrap();
        let caps = re.captures("/devices/ac1/state").unwrap();
        let params = PathParams::from_captures(&re, &caps);
        assert_eq!(params.get("id"), Some("ac1"));
        assert_eq!(params.group(0), Some("/devices/ac1/state"));
        assert_eq!(params.group(2), Some("state"));
    }
}
