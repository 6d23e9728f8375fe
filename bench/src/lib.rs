//! Cold-start benchmark library
//!
//! This module exports the load engine, the platform client and configuration
//! for use by the binary, integration tests and external tooling.

pub mod config;
pub mod engine;
pub mod invocation;
pub mod payload;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use engine::{BenchmarkContext, ErrorSignal, InvocationTask, SweepOrchestrator};
pub use invocation::{InvocationError, InvocationService, WhiskClient};
pub use payload::RequestPayload;
