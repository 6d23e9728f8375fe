//! A single invoke-then-retrieve unit of work

use std::sync::Arc;

use futures_util::future::join_all;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::invocation::InvocationError;

use super::context::BenchmarkContext;
use super::retriever::{ResultRetriever, RetrieveError, RetryPolicy};
use super::signal::ErrorSignal;
use super::types::{RoundOutcome, TaskOutcome};

/// Why a task failed
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Invocation failed: {0}")]
    Invoke(#[source] InvocationError),

    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
}

/// Spawns invoke-and-retrieve tasks against a shared context
///
/// Cloning is cheap: the context and the signal are shared.
#[derive(Clone)]
pub struct InvocationTask {
    context: Arc<BenchmarkContext>,
    retriever: ResultRetriever,
    signal: ErrorSignal,
}

impl InvocationTask {
    pub fn new(context: Arc<BenchmarkContext>, policy: RetryPolicy, signal: ErrorSignal) -> Self {
        let retriever = ResultRetriever::new(Arc::clone(&context.service), policy);
        Self {
            context,
            retriever,
            signal,
        }
    }

    pub fn signal(&self) -> &ErrorSignal {
        &self.signal
    }

    pub fn context(&self) -> &Arc<BenchmarkContext> {
        &self.context
    }

    /// Run one task to completion, raising the signal on failure
    pub async fn run(&self, id: usize) -> TaskOutcome {
        counter!("coldstart_invocations_total").increment(1);
        let started = Instant::now();

        match self.invoke_and_retrieve(id).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                histogram!("coldstart_round_trip_seconds").record(elapsed.as_secs_f64());
                info!("Task {} completed in {:?}", id, elapsed);
                TaskOutcome::Success
            }
            Err(e) => {
                let stage = match e {
                    TaskError::Invoke(_) => "invoke",
                    TaskError::Retrieve(_) => "retrieve",
                };
                counter!("coldstart_task_failures_total", "stage" => stage).increment(1);
                warn!("Task {} failed after {:?}: {}", id, started.elapsed(), e);
                self.signal.raise();
                TaskOutcome::Failure(e.to_string())
            }
        }
    }

    async fn invoke_and_retrieve(&self, id: usize) -> Result<(), TaskError> {
        let ctx = &self.context;
        let invocation = ctx
            .service
            .invoke_action(&ctx.action, &ctx.payload)
            .await
            .map_err(TaskError::Invoke)?;
        info!(
            "Task {} invoked {} as activation {}",
            id, ctx.action, invocation.handle
        );
        debug!("Task {} invoke response: {}", id, invocation.raw_response);

        let result = self.retriever.fetch(&invocation.handle).await?;
        info!("Task {} activation {} result: {}", id, invocation.handle, result);
        Ok(())
    }

    /// Spawn the task onto the runtime without waiting for it
    pub fn spawn(&self, id: usize) -> JoinHandle<TaskOutcome> {
        let task = self.clone();
        tokio::spawn(async move { task.run(id).await })
    }
}

/// Wait for every task of a round and tally the outcome
///
/// A panicked task counts as a failure and raises the signal.
pub(crate) async fn join_round(
    handles: Vec<JoinHandle<TaskOutcome>>,
    signal: &ErrorSignal,
) -> RoundOutcome {
    let mut outcome = RoundOutcome {
        size: handles.len(),
        failures: 0,
    };
    for joined in join_all(handles).await {
        tally_joined(&mut outcome, joined, signal);
    }
    outcome
}

/// Count one joined task's result against a round
pub(crate) fn tally_joined(
    outcome: &mut RoundOutcome,
    joined: Result<TaskOutcome, JoinError>,
    signal: &ErrorSignal,
) {
    match joined {
        Ok(task) if task.is_success() => {}
        Ok(_) => outcome.failures += 1,
        Err(e) => {
            warn!("Task panicked: {}", e);
            signal.raise();
            outcome.failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FetchBehavior, MockInvocationService, create_test_task};

    #[tokio::test]
    async fn test_successful_task() {
        let mock = Arc::new(MockInvocationService::new());
        let (task, signal) = create_test_task(mock.clone());

        assert_eq!(task.run(0).await, TaskOutcome::Success);
        assert!(!signal.is_raised());
        assert_eq!(mock.invokes(), 1);
        assert_eq!(mock.completed(), 1);
    }

    #[tokio::test]
    async fn test_invoke_failure_skips_retrieval() {
        let mock = Arc::new(MockInvocationService::new().with_failing_invocations_from(0));
        let (task, signal) = create_test_task(mock.clone());

        let outcome = task.run(7).await;

        assert!(matches!(outcome, TaskOutcome::Failure(ref reason) if reason.contains("503")));
        assert!(signal.is_raised());
        assert_eq!(mock.fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retrieval_raises_signal() {
        let mock = Arc::new(MockInvocationService::new().with_fetch_behavior(FetchBehavior::NeverReady));
        let (task, signal) = create_test_task(mock.clone());

        let outcome = task.run(1).await;

        assert!(matches!(outcome, TaskOutcome::Failure(ref reason) if reason.contains("Exhausted")));
        assert!(signal.is_raised());
        // create_test_task uses a budget of 3 retries
        assert_eq!(mock.fetches(), 4);
    }

    #[tokio::test]
    async fn test_join_round_counts_failures() {
        let signal = ErrorSignal::new();
        let handles = vec![
            tokio::spawn(async { TaskOutcome::Success }),
            tokio::spawn(async { TaskOutcome::Failure("boom".to_string()) }),
            tokio::spawn(async { TaskOutcome::Success }),
        ];

        let outcome = join_round(handles, &signal).await;

        assert_eq!(outcome, RoundOutcome { size: 3, failures: 1 });
        assert!(!signal.is_raised());
    }

    async fn explode() -> TaskOutcome {
        panic!("task blew up")
    }

    #[tokio::test]
    async fn test_panicked_task_counts_as_failure() {
        let signal = ErrorSignal::new();
        let handles = vec![
            tokio::spawn(async { TaskOutcome::Success }),
            tokio::spawn(explode()),
        ];

        let outcome = join_round(handles, &signal).await;

        assert_eq!(outcome, RoundOutcome { size: 2, failures: 1 });
        assert!(signal.is_raised());
    }
}
