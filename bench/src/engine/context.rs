//! Shared, read-only state for one benchmark run

use std::sync::Arc;

use crate::invocation::InvocationService;
use crate::payload::RequestPayload;

/// Everything an invocation task needs, fixed for the whole run
pub struct BenchmarkContext {
    pub service: Arc<dyn InvocationService>,
    pub action: String,
    pub payload: RequestPayload,
}

impl BenchmarkContext {
    pub fn new(
        service: Arc<dyn InvocationService>,
        action: impl Into<String>,
        payload: RequestPayload,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            action: action.into(),
            payload,
        })
    }
}
