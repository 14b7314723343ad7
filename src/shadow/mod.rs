//! The device-shadow store contract.
//!
//! The shadow is the device's persisted state document, fetched and updated
//! by name through an external service. This module only defines the narrow
//! get/update seam the API handlers consume, plus an in-memory implementation
//! for tests and local development. Timeouts, retries and credentials are the
//! backing client's concern, not this layer's.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors surfaced by a shadow store backend.
#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("no shadow document exists for {thing}")]
    NotFound { thing: String },

    #[error("shadow backend failure: {0}")]
    Backend(String),
}

/// Narrow contract for the external device-state store.
///
/// `update` submits a document patch and resolves once the store has accepted
/// it; the refreshed document is re-read with `get` by callers that need it.
#[async_trait]
pub trait ShadowStore: Send + Sync {
    /// Fetches the shadow document for `thing`.
    async fn get(&self, thing: &str) -> Result<Value, ShadowError>;

    /// Submits `patch` as an update to the shadow document for `thing`.
    async fn update(&self, thing: &str, patch: Value) -> Result<(), ShadowError>;
}

/// In-memory shadow store.
///
/// Updates merge object keys shallowly into the existing document, the way a
/// reported/desired state document accumulates fields; a non-object patch
/// replaces the document wholesale.
///
/// # Examples
///
/// ```
/// use routelet::shadow::{MemoryShadow, ShadowStore};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = MemoryShadow::new(json!({"power": "off"}));
/// store.update("ac-unit-1", json!({"power": "on"})).await.unwrap();
/// let doc = store.get("ac-unit-1").await.unwrap();
/// assert_eq!(doc["power"], "on");
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryShadow {
    document: Mutex<Value>,
}

impl MemoryShadow {
    /// Creates a store seeded with `document`.
    pub fn new(document: Value) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

#[async_trait]
impl ShadowStore for MemoryShadow {
    async fn get(&self, _thing: &str) -> Result<Value, ShadowError> {
        Ok(self.document.lock().await.clone())
    }

    async fn update(&self, _thing: &str, patch: Value) -> Result<(), ShadowError> {
        let mut document = self.document.lock().await;
        match (&mut *document, patch) {
            (Value::Object(doc), Value::Object(patch)) => {
                for (key, value) in patch {
                    doc.insert(key, value);
                }
            }
            (doc, patch) => *doc = patch,
        }
        Ok(())
    }
}
