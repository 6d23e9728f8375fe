//! InvocationService trait definition

use async_trait::async_trait;

use super::types::{ActionSpec, Invocation, InvocationError, InvocationHandle};
use crate::payload::RequestPayload;

/// Trait for action platform clients
///
/// Implementations must be safe to call concurrently from many tasks sharing
/// one instance.
#[async_trait]
pub trait InvocationService: Send + Sync {
    /// Create (deploy) an action
    async fn create_action(&self, spec: &ActionSpec) -> Result<(), InvocationError>;

    /// Invoke an action without waiting for it to finish
    async fn invoke_action(
        &self,
        name: &str,
        payload: &RequestPayload,
    ) -> Result<Invocation, InvocationError>;

    /// Fetch the result of an earlier invocation.
    ///
    /// Returns `InvocationError::NotReady` while the platform is still running it.
    async fn fetch_result(&self, handle: &InvocationHandle) -> Result<String, InvocationError>;

    /// Delete an action
    async fn delete_action(&self, name: &str) -> Result<(), InvocationError>;
}
