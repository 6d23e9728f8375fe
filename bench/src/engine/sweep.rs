//! Multi-step measurement sweeps
//!
//! A sweep walks `Idle -> Warming -> Measuring` for each step and ends in `Idle`,
//! or in `Aborted` as soon as a step finishes with the error signal raised.
//! Aborted sweeps are not retried; the operator re-runs them.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::pacer::RatePacer;
use super::ramp::WarmupRamp;
use super::round::ConcurrentRound;
use super::signal::ErrorSignal;
use super::task::InvocationTask;
use super::types::{
    BenchError, BurstReport, RoundPhase, StepReport, SweepReport, SweepState,
};

/// Drives rate sweeps, provisioned-concurrency sweeps and bursts
pub struct SweepOrchestrator {
    round: ConcurrentRound,
    ramp: WarmupRamp,
    pacer: RatePacer,
    signal: ErrorSignal,
    state: SweepState,
}

impl SweepOrchestrator {
    pub fn new(task: InvocationTask) -> Self {
        let signal = task.signal().clone();
        let round = ConcurrentRound::new(task.clone());
        Self {
            ramp: WarmupRamp::new(round.clone()),
            pacer: RatePacer::new(task),
            round,
            signal,
            state: SweepState::Idle,
        }
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    fn transition(&mut self, next: SweepState) {
        if self.state != next {
            debug!("Sweep state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn finish(&mut self, steps: Vec<StepReport>) -> SweepReport {
        self.transition(SweepState::Idle);
        SweepReport {
            state: SweepState::Idle,
            steps,
        }
    }

    fn abort(&mut self, steps: Vec<StepReport>) -> SweepReport {
        self.transition(SweepState::Aborted);
        SweepReport {
            state: SweepState::Aborted,
            steps,
        }
    }

    /// Step the arrival rate from `start_rate` to `end_rate` inclusive.
    ///
    /// Each step warms up from the previous step's rate, then holds the target
    /// rate for `duration`.
    pub async fn rate_sweep(
        &mut self,
        start_rate: u32,
        end_rate: u32,
        step: u32,
        duration: Duration,
        warmup_step: u32,
    ) -> Result<SweepReport, BenchError> {
        if start_rate == 0 || step == 0 || warmup_step == 0 {
            return Err(BenchError::InvalidArgument(
                "start rate, step and warm-up step must be positive".to_string(),
            ));
        }
        if duration.is_zero() {
            return Err(BenchError::InvalidArgument(
                "duration must be positive".to_string(),
            ));
        }

        info!(
            "Starting rate sweep {}..={} req/s (step {}, {:?} per step)",
            start_rate, end_rate, step, duration
        );

        let mut steps = Vec::new();
        let mut previous = 0;
        let mut target = start_rate;

        while target <= end_rate {
            self.signal.reset();
            let mut report = StepReport::new(target as usize);

            self.transition(SweepState::Warming);
            let warmup = self
                .ramp
                .run(previous as usize, warmup_step as usize, target as usize)
                .await?;
            for outcome in warmup {
                report.record(RoundPhase::Warmup, outcome);
            }

            if !self.signal.is_raised() {
                self.transition(SweepState::Measuring);
                let outcome = self.pacer.run(target as f64, duration).await?;
                report.record(RoundPhase::Measure, outcome);
            }

            steps.push(report);
            if self.signal.is_raised() {
                warn!("Rate sweep aborted at {} req/s after task failures", target);
                return Ok(self.abort(steps));
            }

            previous = target;
            target = match target.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        info!("Rate sweep finished");
        Ok(self.finish(steps))
    }

    /// Walk provisioned levels from `max_provisioned` down to 1.
    ///
    /// For every test concurrency from the level down to 1, a warm burst of the
    /// level's size precedes `repetitions` test bursts. Levels are separated by
    /// `cooldown` so residual warm capacity does not leak into the next level.
    pub async fn provisioned_sweep(
        &mut self,
        max_provisioned: usize,
        cooldown: Duration,
        repetitions: usize,
    ) -> Result<SweepReport, BenchError> {
        if max_provisioned == 0 {
            return Err(BenchError::InvalidArgument(
                "max provisioned concurrency must be positive".to_string(),
            ));
        }

        info!(
            "Starting provisioned-concurrency sweep from {} (cooldown {:?}, {} repetitions)",
            max_provisioned, cooldown, repetitions
        );

        let mut steps = Vec::new();

        for level in (1..=max_provisioned).rev() {
            self.signal.reset();
            let mut report = StepReport::new(level);

            for test in (1..=level).rev() {
                self.transition(SweepState::Warming);
                info!("Provisioned {}: warm burst of {}", level, level);
                report.record(RoundPhase::Warmup, self.round.run(level).await);

                self.transition(SweepState::Measuring);
                for rep in 1..=repetitions {
                    info!(
                        "Provisioned {}: test burst of {} ({}/{})",
                        level, test, rep, repetitions
                    );
                    report.record(RoundPhase::Measure, self.round.run(test).await);
                }

                if self.signal.is_raised() {
                    steps.push(report);
                    warn!(
                        "Provisioned sweep aborted at level {} (test concurrency {}) after task failures",
                        level, test
                    );
                    return Ok(self.abort(steps));
                }
            }

            steps.push(report);
            if level > 1 {
                self.transition(SweepState::Idle);
                info!("Cooling down for {:?} before level {}", cooldown, level - 1);
                tokio::time::sleep(cooldown).await;
            }
        }

        info!("Provisioned-concurrency sweep finished");
        Ok(self.finish(steps))
    }

    /// Repeat a burst of `size` until one completes without failures
    pub async fn burst_until_clean(
        &mut self,
        size: usize,
        max_attempts: usize,
    ) -> Result<BurstReport, BenchError> {
        if max_attempts == 0 {
            return Err(BenchError::InvalidArgument(
                "max attempts must be positive".to_string(),
            ));
        }

        let mut attempts = Vec::new();
        for attempt in 1..=max_attempts {
            self.signal.reset();
            self.transition(SweepState::Measuring);
            info!("Burst of {} (attempt {}/{})", size, attempt, max_attempts);

            let outcome = self.round.run(size).await;
            attempts.push(outcome);

            if !self.signal.is_raised() {
                self.transition(SweepState::Idle);
                return Ok(BurstReport {
                    attempts,
                    clean: true,
                });
            }
            warn!(
                "Last round failed ({} of {} tasks), retrying...",
                outcome.failures, outcome.size
            );
        }

        self.transition(SweepState::Aborted);
        Ok(BurstReport {
            attempts,
            clean: false,
        })
    }
}
