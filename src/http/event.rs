//! The inbound request envelope.
//!
//! Each invocation delivers exactly one [`HttpEvent`], already parsed from
//! transport by the hosting platform. This type is the deserialization target
//! for that JSON document and the raw input to request normalization.

use serde::{Deserialize, Serialize};

use super::{Headers, Method};

/// A raw inbound request envelope.
///
/// Field names follow the envelope's JSON shape (`isBase64Encoded` etc.).
/// `headers` and `cookies` default to empty when absent; `body` is `None`
/// when the envelope carries no body at all, which is distinct from an empty
/// body string.
///
/// # Examples
///
/// ```
/// use routelet::http::{HttpEvent, Method};
///
/// let event: HttpEvent = serde_json::from_str(
///     r#"{"method": "GET", "path": "/api/shadow", "headers": {}}"#,
/// ).unwrap();
///
/// assert_eq!(event.method(), &Method::Get);
/// assert_eq!(event.path(), "/api/shadow");
/// assert!(event.body().is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEvent {
    method: Method,
    path: String,
    #[serde(default)]
    headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cookies: Vec<String>,
}

impl HttpEvent {
    /// Creates a bare envelope with the given method and path.
    ///
    /// Intended for tests and local drivers; production envelopes arrive via
    /// `serde` deserialization.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Headers::new(),
            body: None,
            is_base64_encoded: false,
            cookies: Vec::new(),
        }
    }

    /// Adds a header entry, consuming and returning the envelope.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a text body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.is_base64_encoded = false;
        self
    }

    /// Sets a binary body, base64-encoding it the way the platform would.
    #[must_use]
    pub fn with_binary_body(mut self, body: &[u8]) -> Self {
        use base64::Engine;
        self.body = Some(base64::engine::general_purpose::STANDARD.encode(body));
        self.is_base64_encoded = true;
        self
    }

    /// Appends a `name=value` cookie entry.
    #[must_use]
    pub fn with_cookie(mut self, entry: impl Into<String>) -> Self {
        self.cookies.push(entry.into());
        self
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the envelope headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the raw body string exactly as the envelope carried it.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns `true` if the body string is base64-encoded binary.
    pub fn is_base64_encoded(&self) -> bool {
        self.is_base64_encoded
    }

    /// Returns the ordered `name=value` cookie entries.
    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }
}
