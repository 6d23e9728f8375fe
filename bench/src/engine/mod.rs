//! Load pacing, ramping and result polling engine
//!
//! This module provides:
//! - `ErrorSignal`, the shared "some task failed" flag
//! - `ResultRetriever` for bounded-retry polling of asynchronous results
//! - `ConcurrentRound`, `WarmupRamp` and `RatePacer` load shapes
//! - `SweepOrchestrator` driving rate and provisioned-concurrency sweeps

mod context;
mod pacer;
mod ramp;
mod retriever;
mod round;
mod signal;
mod sweep;
mod task;
mod types;

pub use context::BenchmarkContext;
pub use pacer::{ArrivalSchedule, RatePacer, ScheduleStep};
pub use ramp::WarmupRamp;
pub use retriever::{PollState, ResultRetriever, RetrieveError, RetryPolicy};
pub use round::ConcurrentRound;
pub use signal::ErrorSignal;
pub use sweep::SweepOrchestrator;
pub use task::{InvocationTask, TaskError};
pub use types::{
    BenchError, BurstReport, RoundOutcome, RoundPhase, RoundRecord, StepReport, SweepReport,
    SweepState, TaskOutcome,
};
