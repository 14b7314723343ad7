//! The outbound response envelope and its builder.
//!
//! Handlers produce an [`HttpResponse`] through [`respond`], which normalizes
//! whatever the handler has — text, structured data, or raw bytes — into the
//! envelope shape the platform expects.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::cookies::CookieJar;

use super::Headers;

/// A handler's result value, before normalization into an envelope body.
///
/// Modeled as a tagged variant so the builder never has to sniff runtime
/// types: text passes through, structured values serialize to JSON, and raw
/// bytes get base64-encoded for transport.
#[derive(Debug, Clone)]
pub enum Body {
    /// Plain text, passed through verbatim.
    Text(String),
    /// Raw bytes, base64-encoded into the envelope.
    Bytes(Bytes),
    /// A structured value, serialized to JSON text.
    Json(Value),
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_owned())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(b))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Self {
        Body::Json(v)
    }
}

/// An outbound response envelope, ready to hand back to the platform.
///
/// `statusDescription` is always `"OK"`, even for error statuses — that is
/// the behavior the consuming platform has always seen and it is preserved
/// deliberately (the tests pin it down).
///
/// # Examples
///
/// ```
/// use routelet::http::respond;
///
/// let response = respond("hello").build();
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.body(), "hello");
/// assert_eq!(response.headers().get("content-type"), Some("text/html"));
/// assert!(!response.is_base64_encoded());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    status_code: u16,
    status_description: &'static str,
    body: String,
    headers: Headers,
    is_base64_encoded: bool,
}

impl HttpResponse {
    /// Returns the numeric status code.
    pub fn status(&self) -> u16 {
        self.status_code
    }

    /// Returns the envelope's status description line.
    pub fn description(&self) -> &str {
        self.status_description
    }

    /// Returns the body text (base64 when [`is_base64_encoded`](Self::is_base64_encoded)).
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns `true` if the body is base64-encoded binary.
    pub fn is_base64_encoded(&self) -> bool {
        self.is_base64_encoded
    }
}

/// Starts building a response from any [`Body`]-convertible value.
///
/// # Examples
///
/// ```
/// use routelet::http::respond;
/// use serde_json::json;
///
/// let response = respond(json!({"state": "OK"})).build();
/// assert_eq!(response.headers().get("content-type"), Some("application/json"));
///
/// let response = respond("gone").status(404).build();
/// assert_eq!(response.status(), 404);
/// ```
pub fn respond(body: impl Into<Body>) -> ResponseBuilder {
    ResponseBuilder {
        body: body.into(),
        status_code: 200,
        headers: Headers::new(),
        cookie_headers: None,
        is_json: false,
    }
}

/// Fluent builder returned by [`respond`].
#[derive(Debug)]
pub struct ResponseBuilder {
    body: Body,
    status_code: u16,
    headers: Headers,
    cookie_headers: Option<Headers>,
    is_json: bool,
}

impl ResponseBuilder {
    /// Sets the status code. Defaults to 200.
    #[must_use]
    pub fn status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Adds an explicit response header. An explicit `Content-Type` here wins
    /// over the builder's content-type inference.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merges the jar's staged outgoing headers into the response. Staged
    /// cookie headers override explicit headers on name collision.
    #[must_use]
    pub fn cookies(mut self, jar: &CookieJar) -> Self {
        self.cookie_headers = Some(jar.outgoing().clone());
        self
    }

    /// Forces the `application/json` content type for a text body that is
    /// already serialized JSON. Structured bodies set this implicitly.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.is_json = true;
        self
    }

    /// Normalizes the accumulated parts into an [`HttpResponse`].
    pub fn build(self) -> HttpResponse {
        let mut headers = self.headers;
        let mut is_json = self.is_json;

        let (body, is_base64_encoded) = match self.body {
            Body::Json(value) => {
                is_json = true;
                (value.to_string(), false)
            }
            Body::Text(text) => (text, false),
            Body::Bytes(bytes) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                (encoded, true)
            }
        };

        if !headers.contains("content-type") {
            let content_type = if is_json { "application/json" } else { "text/html" };
            headers.insert("Content-Type", content_type);
        }

        if let Some(cookie_headers) = &self.cookie_headers {
            headers.extend_override(cookie_headers);
        }

        HttpResponse {
            status_code: self.status_code,
            status_description: "OK",
            body,
            headers,
            is_base64_encoded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_body_defaults() {
        let r = respond("foo").build();
        assert_eq!(r.status(), 200);
        assert_eq!(r.body(), "foo");
        assert_eq!(r.headers().get("content-type"), Some("text/html"));
        assert!(!r.is_base64_encoded());
    }

    #[test]
    fn structured_body_round_trips_as_json() {
        let original = json!({"temp": 21.5, "modes": ["cool", "fan"]});
        let r = respond(original.clone()).build();
        assert_eq!(r.headers().get("content-type"), Some("application/json"));
        let decoded: Value = serde_json::from_str(r.body()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn bytes_body_is_base64_marked() {
        let payload = vec![0u8, 159, 146, 150];
        let r = respond(payload.clone()).build();
        assert!(r.is_base64_encoded());

        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(r.body())
            .unwrap();
        assert_eq!(decoded, payload);
        // Binary bodies still fall back to text/html absent an explicit type.
        assert_eq!(r.headers().get("content-type"), Some("text/html"));
    }

    #[test]
    fn explicit_content_type_wins() {
        let r = respond(json!({"a": 1}))
            .header("Content-Type", "application/vnd.custom+json")
            .build();
        assert_eq!(
            r.headers().get("content-type"),
            Some("application/vnd.custom+json")
        );
    }

    #[test]
    fn json_flag_on_text_body() {
        let r = respond(r#"{"pre": "serialized"}"#).json().build();
        assert_eq!(r.headers().get("content-type"), Some("application/json"));
    }

    #[test]
    fn status_description_is_always_ok() {
        // Quirk preserved on purpose: the description never tracks the code.
        assert_eq!(respond("").status(404).build().description(), "OK");
        assert_eq!(respond("").status(500).build().description(), "OK");
    }

    #[test]
    fn cookie_headers_override_explicit() {
        let mut jar = CookieJar::from_entries(&[]);
        jar.add("secret");
        let r = respond("ok")
            .header("Set-Cookie", "stale=1")
            .cookies(&jar)
            .build();
        let set: Vec<_> = r.headers().get_all("set-cookie").collect();
        assert_eq!(set.len(), 1);
        assert!(set[0].starts_with("auth_key="));
    }

    #[test]
    fn serializes_to_envelope_shape() {
        let r = respond("body").status(201).build();
        let v: Value = serde_json::to_value(&r).unwrap();
        assert_eq!(v["statusCode"], 201);
        assert_eq!(v["statusDescription"], "OK");
        assert_eq!(v["body"], "body");
        assert_eq!(v["isBase64Encoded"], false);
        assert!(v["headers"].is_object());
    }
}
