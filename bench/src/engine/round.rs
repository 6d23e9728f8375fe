//! Fire-all-at-once burst of concurrent tasks

use tracing::debug;

use super::signal::ErrorSignal;
use super::task::{InvocationTask, join_round};
use super::types::RoundOutcome;

/// Launches `n` tasks with no pacing and waits for all of them
#[derive(Clone)]
pub struct ConcurrentRound {
    task: InvocationTask,
}

impl ConcurrentRound {
    pub fn new(task: InvocationTask) -> Self {
        Self { task }
    }

    pub fn signal(&self) -> &ErrorSignal {
        self.task.signal()
    }

    /// Run one round of `n` concurrent tasks
    pub async fn run(&self, n: usize) -> RoundOutcome {
        debug!("Launching round of {} concurrent tasks", n);
        let handles: Vec<_> = (0..n).map(|id| self.task.spawn(id)).collect();
        let outcome = join_round(handles, self.task.signal()).await;
        debug!(
            "Round of {} finished with {} failures",
            outcome.size, outcome.failures
        );
        outcome
    }
}
