//! Environment-derived configuration.
//!
//! Secrets and identifiers are collected once into a [`Config`] value and
//! passed into the handlers that need them, instead of being read from the
//! environment ad hoc. Tests construct a `Config` directly with known values.

use thiserror::Error;
use tracing::warn;

/// Fallback cookie-signing secret when `MASTER_KEY` is unset. Insecure by
/// definition; kept for parity with existing deployments.
const DEFAULT_MASTER_KEY: &str = "abcd1234";

/// Errors produced while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {name}")]
    MissingVar { name: &'static str },
}

/// Shared secrets and identifiers consumed by the auth and shadow endpoints.
#[derive(Debug, Clone)]
pub struct Config {
    master_key: String,
    access_token: String,
    thing_name: String,
}

impl Config {
    /// Builds a configuration with explicit values.
    pub fn new(
        master_key: impl Into<String>,
        access_token: impl Into<String>,
        thing_name: impl Into<String>,
    ) -> Self {
        Self {
            master_key: master_key.into(),
            access_token: access_token.into(),
            thing_name: thing_name.into(),
        }
    }

    /// Loads configuration from the environment.
    ///
    /// `ACCESS_TOKEN` and `THING_NAME` are required. `MASTER_KEY` falls back
    /// to a well-known default when unset; that default cannot protect
    /// anything and a warning is logged when it is in effect.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] when a required variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let master_key = match std::env::var("MASTER_KEY") {
            Ok(v) => v,
            Err(_) => {
                warn!("MASTER_KEY unset, using the well-known default signing secret");
                DEFAULT_MASTER_KEY.to_owned()
            }
        };
        let access_token =
            std::env::var("ACCESS_TOKEN").map_err(|_| ConfigError::MissingVar {
                name: "ACCESS_TOKEN",
            })?;
        let thing_name = std::env::var("THING_NAME").map_err(|_| ConfigError::MissingVar {
            name: "THING_NAME",
        })?;

        Ok(Self {
            master_key,
            access_token,
            thing_name,
        })
    }

    /// The cookie-signing secret.
    pub fn master_key(&self) -> &str {
        &self.master_key
    }

    /// The secret compared against the `access_token` login field.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The device identifier used to address the shadow document.
    pub fn thing_name(&self) -> &str {
        &self.thing_name
    }
}
