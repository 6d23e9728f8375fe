//! Request payload sent with every invocation
//!
//! The payload is a flat JSON object loaded once per run and shared read-only
//! across all invocation tasks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading a payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Failed to read payload file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse payload file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parameters describing one unit of work for the benchmarked action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Model identifier
    #[serde(default)]
    pub model_type: String,
    /// User identifier
    #[serde(default)]
    pub user_id: String,
    /// Key service host
    #[serde(rename = "key_service_address", default)]
    pub key_service_addr: String,
    /// Key service port
    #[serde(default)]
    pub key_service_port: u16,
    /// Opaque sample data
    #[serde(default)]
    pub encrypted_sample: String,
    /// Any further flat fields are passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestPayload {
    /// Load a payload from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PayloadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PayloadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let payload: Self = serde_json::from_str(&raw).map_err(|source| PayloadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loaded payload from {:?}: model_type={}, sample_bytes={}",
            path,
            payload.model_type,
            payload.encrypted_sample.len()
        );
        Ok(payload)
    }

    /// Point the payload at a different key service host
    pub fn with_key_service_addr(mut self, addr: impl Into<String>) -> Self {
        self.key_service_addr = addr.into();
        self
    }
}
