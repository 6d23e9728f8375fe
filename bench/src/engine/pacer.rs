//! Open-loop fixed-rate dispatch
//!
//! Dispatch points are laid out at `k / rate` seconds from a captured start time.
//! Each point spawns a task and moves on without waiting for it; a late loop
//! dispatches right away instead of bursting to catch up. All tasks are joined
//! when the schedule ends.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::signal::ErrorSignal;
use super::task::{InvocationTask, tally_joined};
use super::types::{BenchError, RoundOutcome};

/// One planned dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleStep {
    pub index: u64,
    /// Offset from the round's start time
    pub offset: Duration,
}

/// Lazily generated dispatch offsets for a fixed rate
#[derive(Debug, Clone)]
pub struct ArrivalSchedule {
    rate: f64,
    interval: Duration,
    horizon_secs: f64,
    next: u64,
}

impl ArrivalSchedule {
    pub fn new(rate: f64, duration: Duration) -> Result<Self, BenchError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(BenchError::InvalidArgument(format!(
                "rate must be positive, got {}",
                rate
            )));
        }
        if duration.is_zero() {
            return Err(BenchError::InvalidArgument(
                "duration must be positive".to_string(),
            ));
        }
        let interval = Duration::try_from_secs_f64(1.0 / rate).map_err(|_| {
            BenchError::InvalidArgument(format!("rate {} is too low to schedule", rate))
        })?;
        Ok(Self {
            rate,
            interval,
            horizon_secs: duration.as_secs_f64(),
            next: 0,
        })
    }

    /// Spacing between consecutive dispatches
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Iterator for ArrivalSchedule {
    type Item = ScheduleStep;

    fn next(&mut self) -> Option<ScheduleStep> {
        // Computed from the index rather than accumulated, so the count does
        // not drift with floating-point error.
        let offset = self.next as f64 / self.rate;
        if offset >= self.horizon_secs {
            return None;
        }
        let step = ScheduleStep {
            index: self.next,
            offset: Duration::from_secs_f64(offset),
        };
        self.next += 1;
        Some(step)
    }
}

/// Dispatches tasks at a fixed rate for a fixed duration
#[derive(Clone)]
pub struct RatePacer {
    task: InvocationTask,
}

impl RatePacer {
    pub fn new(task: InvocationTask) -> Self {
        Self { task }
    }

    pub fn signal(&self) -> &ErrorSignal {
        self.task.signal()
    }

    /// Run one paced round.
    ///
    /// Stops scheduling once the error signal is raised, but always waits for
    /// tasks already dispatched. Finished tasks are reaped between dispatches.
    pub async fn run(&self, rate: f64, duration: Duration) -> Result<RoundOutcome, BenchError> {
        let schedule = ArrivalSchedule::new(rate, duration)?;
        let interval = schedule.interval();
        info!("Pacing {} req/s for {:?}", rate, duration);

        let t0 = Instant::now();
        let mut in_flight = JoinSet::new();
        let mut outcome = RoundOutcome::default();
        let mut max_slip = Duration::ZERO;

        for step in schedule {
            let target = t0 + step.offset;
            let now = Instant::now();
            if now < target {
                tokio::time::sleep_until(target).await;
            } else {
                max_slip = max_slip.max(now - target);
            }

            if self.task.signal().is_raised() {
                warn!(
                    "Stopping schedule at dispatch {} after task failures",
                    step.index
                );
                break;
            }

            let task = self.task.clone();
            let id = step.index as usize;
            in_flight.spawn(async move { task.run(id).await });
            outcome.size += 1;

            while let Some(joined) = in_flight.try_join_next() {
                tally_joined(&mut outcome, joined, self.task.signal());
            }
        }

        if max_slip > interval {
            warn!(
                "Schedule slipped by up to {:?} (interval {:?})",
                max_slip, interval
            );
        }
        debug!(
            "Dispatched {} tasks in {:?}, waiting for {} still in flight",
            outcome.size,
            t0.elapsed(),
            in_flight.len()
        );

        while let Some(joined) = in_flight.join_next().await {
            tally_joined(&mut outcome, joined, self.task.signal());
        }
        info!(
            "Paced round at {} req/s finished: {} dispatched, {} failed",
            rate, outcome.size, outcome.failures
        );
        Ok(outcome)
    }
}
