//! Engine result types and error definitions

use serde::Serialize;
use thiserror::Error;

/// Errors that reject a load shape before it starts
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result of a single invoke-and-retrieve task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failure(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Aggregate of one round of concurrent tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    /// Tasks dispatched in the round
    pub size: usize,
    /// Tasks that ended in failure
    pub failures: usize,
}

impl RoundOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Sweep lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepState {
    Idle,
    Warming,
    Measuring,
    Aborted,
}

/// What a round was run for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Warmup,
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    pub phase: RoundPhase,
    pub outcome: RoundOutcome,
}

/// Rounds run for one sweep step
///
/// `level` is the target rate for a rate sweep and the provisioned level for a
/// provisioned-concurrency sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub level: usize,
    pub rounds: Vec<RoundRecord>,
}

impl StepReport {
    pub fn new(level: usize) -> Self {
        Self {
            level,
            rounds: Vec::new(),
        }
    }

    pub fn record(&mut self, phase: RoundPhase, outcome: RoundOutcome) {
        self.rounds.push(RoundRecord { phase, outcome });
    }

    /// Round sizes in execution order
    pub fn sizes(&self) -> Vec<usize> {
        self.rounds.iter().map(|r| r.outcome.size).collect()
    }
}

/// Everything a sweep ran, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub state: SweepState,
    pub steps: Vec<StepReport>,
}

impl SweepReport {
    pub fn aborted(&self) -> bool {
        self.state == SweepState::Aborted
    }

    pub fn total_dispatched(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| s.rounds.iter())
            .map(|r| r.outcome.size)
            .sum()
    }

    pub fn total_failures(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| s.rounds.iter())
            .map(|r| r.outcome.failures)
            .sum()
    }

    /// Serialize to JSON for log scraping
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Burst attempts until a clean round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BurstReport {
    pub attempts: Vec<RoundOutcome>,
    pub clean: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut step = StepReport::new(3);
        step.record(RoundPhase::Warmup, RoundOutcome { size: 3, failures: 0 });
        step.record(RoundPhase::Measure, RoundOutcome { size: 2, failures: 1 });

        let report = SweepReport {
            state: SweepState::Aborted,
            steps: vec![step],
        };

        assert!(report.aborted());
        assert_eq!(report.total_dispatched(), 5);
        assert_eq!(report.total_failures(), 1);
        assert_eq!(report.steps[0].sizes(), vec![3, 2]);
        assert!(report.to_json().contains("\"state\":\"aborted\""));
    }
}
