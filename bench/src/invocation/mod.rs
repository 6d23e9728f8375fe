//! Invocation service module for talking to the action platform
//!
//! This module provides:
//! - `InvocationService` trait for abstracting the platform client
//! - `WhiskClient` for driving an OpenWhisk deployment over its REST API
//! - Handle and error types shared by the benchmark engine

mod service;
mod types;
mod whisk;

pub use service::InvocationService;
pub use types::{ActionSpec, Invocation, InvocationError, InvocationHandle};
pub use whisk::WhiskClient;
