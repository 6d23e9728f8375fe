//! Gradual burst-size ramp to pre-warm the platform
//!
//! Jumping straight to the target concurrency makes the platform start many cold
//! containers at once. The ramp grows the burst size step by step and finishes
//! two steps past the target.

use tracing::{info, warn};

use super::round::ConcurrentRound;
use super::types::{BenchError, RoundOutcome};

/// Increasing sequence of concurrent rounds
#[derive(Clone)]
pub struct WarmupRamp {
    round: ConcurrentRound,
}

impl WarmupRamp {
    pub fn new(round: ConcurrentRound) -> Self {
        Self { round }
    }

    /// Burst sizes the ramp will run, in order
    pub fn sizes(start: usize, step: usize, target: usize) -> Result<Vec<usize>, BenchError> {
        if step == 0 {
            return Err(BenchError::InvalidArgument(
                "warm-up step must be positive".to_string(),
            ));
        }
        let limit = target.saturating_add(step.saturating_mul(2));
        Ok((start..limit).step_by(step).filter(|&size| size > 0).collect())
    }

    /// Run each step's round to completion before starting the next.
    ///
    /// Stops early once the error signal is raised.
    pub async fn run(
        &self,
        start: usize,
        step: usize,
        target: usize,
    ) -> Result<Vec<RoundOutcome>, BenchError> {
        let sizes = Self::sizes(start, step, target)?;
        let mut rounds = Vec::with_capacity(sizes.len());

        for size in sizes {
            info!("Warming up (burst size: {})", size);
            rounds.push(self.round.run(size).await);

            if self.round.signal().is_raised() {
                warn!("Warm-up stopped at burst size {} after task failures", size);
                return Ok(rounds);
            }
        }

        info!("Warm up done");
        Ok(rounds)
    }
}
