//! Test Utilities Module
//!
//! Provides an in-memory `InvocationService` with scriptable latency, readiness
//! and failure behavior. This module is only compiled when running tests.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::engine::{BenchmarkContext, ErrorSignal, InvocationTask, RetryPolicy};
use crate::invocation::{
    ActionSpec, Invocation, InvocationError, InvocationHandle, InvocationService,
};
use crate::payload::RequestPayload;

// ============================================================================
// Mock Service
// ============================================================================

/// How `fetch_result` behaves for every handle
#[derive(Debug, Clone, Copy)]
pub enum FetchBehavior {
    /// Not ready for the given number of polls, then ready
    ReadyAfter(usize),
    /// Never ready
    NeverReady,
    /// Fails with a non-retryable error
    Reject,
}

/// Scriptable in-memory action platform
pub struct MockInvocationService {
    fetch_behavior: FetchBehavior,
    invoke_delay: Duration,
    /// Invocations numbered at or above this index are rejected
    fail_invocations_from: Option<usize>,

    invokes: AtomicUsize,
    fetches: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    polls: Mutex<HashMap<InvocationHandle, usize>>,
}

impl MockInvocationService {
    /// Create a mock whose results are ready on the first poll
    pub fn new() -> Self {
        Self {
            fetch_behavior: FetchBehavior::ReadyAfter(0),
            invoke_delay: Duration::ZERO,
            fail_invocations_from: None,
            invokes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            polls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_fetch_behavior(mut self, behavior: FetchBehavior) -> Self {
        self.fetch_behavior = behavior;
        self
    }

    pub fn with_invoke_delay(mut self, delay: Duration) -> Self {
        self.invoke_delay = delay;
        self
    }

    pub fn with_failing_invocations_from(mut self, index: usize) -> Self {
        self.fail_invocations_from = Some(index);
        self
    }

    /// Number of `invoke_action` calls
    pub fn invokes(&self) -> usize {
        self.invokes.load(Ordering::SeqCst)
    }

    /// Number of `fetch_result` calls
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of results handed out as ready
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous `invoke_action` calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvocationService for MockInvocationService {
    async fn create_action(&self, _spec: &ActionSpec) -> Result<(), InvocationError> {
        Ok(())
    }

    async fn invoke_action(
        &self,
        name: &str,
        _payload: &RequestPayload,
    ) -> Result<Invocation, InvocationError> {
        let index = self.invokes.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.invoke_delay.is_zero() {
            tokio::time::sleep(self.invoke_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(from) = self.fail_invocations_from
            && index >= from
        {
            return Err(InvocationError::Rejected {
                status: 503,
                body: format!("{} is overloaded", name),
            });
        }

        let handle = InvocationHandle::new(Uuid::new_v4().simple().to_string());
        Ok(Invocation {
            raw_response: format!("{{\"activationId\":\"{}\"}}", handle),
            handle,
        })
    }

    async fn fetch_result(&self, handle: &InvocationHandle) -> Result<String, InvocationError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        match self.fetch_behavior {
            FetchBehavior::Reject => Err(InvocationError::Rejected {
                status: 401,
                body: "unauthorized".to_string(),
            }),
            FetchBehavior::NeverReady => Err(InvocationError::NotReady(handle.clone())),
            FetchBehavior::ReadyAfter(pending) => {
                let seen = {
                    let mut polls = self.polls.lock().unwrap();
                    let count = polls.entry(handle.clone()).or_insert(0);
                    *count += 1;
                    *count
                };
                if seen <= pending {
                    Err(InvocationError::NotReady(handle.clone()))
                } else {
                    self.completed.fetch_add(1, Ordering::SeqCst);
                    Ok(format!("{{\"activationId\":\"{}\",\"response\":{{\"status\":\"success\"}}}}", handle))
                }
            }
        }
    }

    async fn delete_action(&self, _name: &str) -> Result<(), InvocationError> {
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Retry policy with a short delay for tests
pub fn fast_retry_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        delay: Duration::from_millis(10),
    }
}

/// Build a task wired to the given mock
pub fn create_test_task(mock: Arc<MockInvocationService>) -> (InvocationTask, ErrorSignal) {
    let context = BenchmarkContext::new(mock, "test-action", RequestPayload::default());
    let signal = ErrorSignal::new();
    let task = InvocationTask::new(context, fast_retry_policy(3), signal.clone());
    (task, signal)
}
