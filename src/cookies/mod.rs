//! Signed-cookie session primitive.
//!
//! The auth cookie is a shared-secret capability token of the form
//! `auth_key=<nonce>.<digest>` with `digest = hex(SHA-256(secret + nonce))`.
//! There is no expiry, no revocation, and no per-user identity: possession of
//! a token only the server could have minted is the whole scheme.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::http::Headers;

/// Name of the session cookie.
const AUTH_COOKIE: &str = "auth_key";

/// Per-invocation cookie state: the parsed inbound cookies and any staged
/// outgoing `Set-Cookie` header.
///
/// # Examples
///
/// ```
/// use routelet::cookies::CookieJar;
///
/// let mut jar = CookieJar::from_entries(&["theme=dark".to_owned()]);
/// assert_eq!(jar.get("theme"), Some("dark"));
/// assert!(!jar.check("secret"));
///
/// jar.add("secret");
/// assert!(jar.outgoing().contains("set-cookie"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    incoming: Vec<(String, String)>,
    outgoing: Headers,
}

impl CookieJar {
    /// Parses the envelope's ordered `name=value` cookie entries.
    ///
    /// Entries without an `=` cannot name a cookie; they are skipped (and
    /// logged) rather than failing the whole invocation, so a garbled cookie
    /// header degrades to "no session".
    pub fn from_entries(entries: &[String]) -> Self {
        let mut incoming = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.split_once('=') {
                Some((name, value)) => incoming.push((name.to_owned(), value.to_owned())),
                None => warn!(entry = %entry, "skipping malformed cookie entry"),
            }
        }
        Self {
            incoming,
            outgoing: Headers::new(),
        }
    }

    /// Returns the raw value of an inbound cookie by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.incoming
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Verifies the inbound auth cookie against `secret`.
    ///
    /// True iff an `auth_key` cookie exists, its value is exactly
    /// `<nonce>.<digest>`, and the digest matches a fresh recomputation.
    /// The digest is recomputed from scratch on every call and compared
    /// without short-circuiting.
    pub fn check(&self, secret: &str) -> bool {
        let Some(value) = self.get(AUTH_COOKIE) else {
            return false;
        };

        let parts: Vec<&str> = value.split('.').collect();
        let [nonce, digest] = parts.as_slice() else {
            return false;
        };

        constant_time_eq(digest.as_bytes(), sign(secret, nonce).as_bytes())
    }

    /// Mints a fresh auth cookie and stages it as the outgoing `Set-Cookie`
    /// header, overwriting anything staged earlier.
    ///
    /// The nonce is 64 random bits rendered in shortest hex form.
    pub fn add(&mut self, secret: &str) {
        let nonce = format!("{:x}", OsRng.next_u64());
        let digest = sign(secret, &nonce);
        self.outgoing
            .set("Set-Cookie", format!("{AUTH_COOKIE}={nonce}.{digest}"));
    }

    /// Returns the staged outgoing headers. Empty until [`add`](Self::add)
    /// is called.
    pub fn outgoing(&self) -> &Headers {
        &self.outgoing
    }
}

// hex(SHA-256(secret + nonce))
fn sign(secret: &str, nonce: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(nonce.as_bytes());
    format!("{:x}", hasher.finalize())
}

// Length check up front, then a full pass regardless of where bytes differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
