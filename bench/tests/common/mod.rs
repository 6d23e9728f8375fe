//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

use async_trait::async_trait;
use coldstart_bench::invocation::{ActionSpec, Invocation, InvocationHandle};
use coldstart_bench::{InvocationError, InvocationService, RequestPayload};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// In-memory platform that records when and with what it was called
#[derive(Default)]
pub struct RecordingService {
    /// Polls answered "not ready" before a result is available
    pub pending_polls: usize,
    /// Time each invocation takes to be accepted
    pub latency: Duration,

    next_id: AtomicUsize,
    completions: AtomicUsize,
    invoke_times: Mutex<Vec<Instant>>,
    models_seen: Mutex<Vec<String>>,
    polls: Mutex<HashMap<InvocationHandle, usize>>,
    actions: Mutex<Vec<String>>,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn invoke_times(&self) -> Vec<Instant> {
        self.invoke_times.lock().unwrap().clone()
    }

    pub fn models_seen(&self) -> Vec<String> {
        self.models_seen.lock().unwrap().clone()
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl InvocationService for RecordingService {
    async fn create_action(&self, spec: &ActionSpec) -> Result<(), InvocationError> {
        self.actions.lock().unwrap().push(spec.name.clone());
        Ok(())
    }

    async fn invoke_action(
        &self,
        _name: &str,
        payload: &RequestPayload,
    ) -> Result<Invocation, InvocationError> {
        self.invoke_times.lock().unwrap().push(Instant::now());
        self.models_seen
            .lock()
            .unwrap()
            .push(payload.model_type.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(Invocation {
            handle: InvocationHandle::new(format!("activation-{}", id)),
            raw_response: String::new(),
        })
    }

    async fn fetch_result(&self, handle: &InvocationHandle) -> Result<String, InvocationError> {
        let seen = {
            let mut polls = self.polls.lock().unwrap();
            let count = polls.entry(handle.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if seen <= self.pending_polls {
            return Err(InvocationError::NotReady(handle.clone()));
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{{\"activationId\":\"{}\"}}", handle))
    }

    async fn delete_action(&self, name: &str) -> Result<(), InvocationError> {
        self.actions.lock().unwrap().retain(|a| a != name);
        Ok(())
    }
}

/// Write a payload file in the format the benchmark loads
pub fn write_payload_file(model_type: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("coldstart-payload-{}.json", uuid::Uuid::new_v4()));
    let body = serde_json::json!({
        "model_type": model_type,
        "user_id": "admin",
        "key_service_address": "10.10.10.227",
        "key_service_port": 13571,
        "encrypted_sample": "ab6teZMD",
    });
    std::fs::write(&path, body.to_string()).expect("Failed to write payload file");
    path
}
