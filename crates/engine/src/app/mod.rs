mod loop_runner;
mod metrics;

pub use loop_runner::{
    run_world, step_world, AppError, InputFeed, LoopConfig, NoInput, RunSummary, StopReason,
    TickKind,
};
pub use metrics::{LoopMetricsSnapshot, RunMetrics};
