//! Invocation-related types and error definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by an invocation service
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Result not ready yet: {0}")]
    NotReady(InvocationHandle),

    #[error("Platform rejected request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The activation record exists but the action itself did not succeed
    #[error("Activation {handle} failed with {status}: {result}")]
    ActivationFailed {
        handle: InvocationHandle,
        status: String,
        result: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl InvocationError {
    /// Whether this is the transient "not found yet" condition
    pub fn is_not_ready(&self) -> bool {
        matches!(self, InvocationError::NotReady(_))
    }
}

impl From<reqwest::Error> for InvocationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            InvocationError::Decode(e.to_string())
        } else {
            InvocationError::Transport(e.to_string())
        }
    }
}

/// Opaque identifier correlating an invocation with its asynchronous result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationHandle(String);

impl InvocationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvocationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepted invocation: handle plus the raw platform response
#[derive(Debug, Clone)]
pub struct Invocation {
    pub handle: InvocationHandle,
    pub raw_response: String,
}

/// Deployment description for an action
#[derive(Debug, Clone)]
pub struct ActionSpec {
    /// Action name
    pub name: String,
    /// Runtime kind (e.g. "blackbox")
    pub kind: String,
    /// Container image for blackbox actions
    pub image: String,
    /// Per-container concurrency limit
    pub concurrency: u32,
    /// Action timeout in milliseconds
    pub timeout_ms: u64,
}
