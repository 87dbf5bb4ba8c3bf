use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ecs::World;
use crate::sim::{CameraFocus, InputEvent, Stats, WindowExitEvent};

use super::metrics::{RunMetrics, TickTimer};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this much simulated time. `None` runs until a
    /// `WindowExitEvent`.
    pub run_for: Option<Duration>,
    /// Pace frames against the wall clock. Off, every frame advances the
    /// clock by exactly one fixed step.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            run_for: None,
            realtime: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("world has no systems registered; nothing to run")]
    EmptyPipeline,
    #[error("configured run length {0:?} is shorter than one tick")]
    RunTooShort(Duration),
}

/// Source of raw input for the loop. Called once per fixed tick, before the
/// world updates.
pub trait InputFeed {
    fn events_for_tick(&mut self, tick: u64) -> Vec<InputEvent>;
}

impl<F> InputFeed for F
where
    F: FnMut(u64) -> Vec<InputEvent>,
{
    fn events_for_tick(&mut self, tick: u64) -> Vec<InputEvent> {
        self(tick)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoInput;

impl InputFeed for NoInput {
    fn events_for_tick(&mut self, _tick: u64) -> Vec<InputEvent> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ExitRequested,
    RunLengthReached,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub simulated: Duration,
    pub stop_reason: StopReason,
    pub metrics: RunMetrics,
}

/// How one tick was applied, decided by the camera focus's time rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickKind {
    Full { dt: f32 },
    SimulationOnly { dt: f32 },
}

/// Advances `world` by one tick of `dt`. The world runs on the focus's
/// clock: a slowed focus sees everything else sped up, and a frozen focus
/// keeps simulating while display systems hold still.
pub fn step_world(world: &mut World, dt: f32) -> TickKind {
    let rate = world
        .registry()
        .singleton::<CameraFocus>()
        .and_then(|(focus, _)| world.registry().get::<Stats>(focus))
        .map(Stats::subjective_time_rate);

    match rate {
        Some(rate) if rate == 0.0 => {
            world.update_simulation(dt);
            TickKind::SimulationOnly { dt }
        }
        Some(rate) => {
            let dt = dt / rate;
            world.update_all(dt);
            TickKind::Full { dt }
        }
        None => {
            world.update_all(dt);
            TickKind::Full { dt }
        }
    }
}

/// Drives `world` on a fixed step until the run length is reached or a
/// `WindowExitEvent` is published.
pub fn run_world(
    config: &LoopConfig,
    world: &mut World,
    input: &mut dyn InputFeed,
) -> Result<RunSummary, AppError> {
    if world.system_names().is_empty() {
        return Err(AppError::EmptyPipeline);
    }

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let tick_limit = match config.run_for {
        Some(run_for) => {
            let ticks = (run_for.as_secs_f64() / fixed_dt.as_secs_f64()).round() as u64;
            if ticks == 0 {
                return Err(AppError::RunTooShort(run_for));
            }
            Some(ticks)
        }
        None => None,
    };

    let exit_requested = Rc::new(Cell::new(false));
    let exit_flag = Rc::clone(&exit_requested);
    world.bus_mut().on::<WindowExitEvent>(move |_, _| {
        exit_flag.set(true);
    });

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        realtime = config.realtime,
        tick_limit = ?tick_limit,
        systems = ?world.system_names(),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut tick_timer = TickTimer::new(metrics_log_interval, last_frame_instant);
    let mut ticks = 0u64;

    let stop_reason = 'frames: loop {
        let frame_dt = if config.realtime {
            let elapsed = Instant::now().saturating_duration_since(last_frame_instant);
            if elapsed < fixed_dt {
                thread::sleep(fixed_dt - elapsed);
            }
            let now = Instant::now();
            let raw = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            raw
        } else {
            fixed_dt
        };

        let clamped_frame_dt = clamp_frame_delta(frame_dt, max_frame_delta);
        accumulator = accumulator.saturating_add(clamped_frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            for event in input.events_for_tick(ticks) {
                world.publish(event);
            }
            if exit_requested.get() {
                break 'frames StopReason::ExitRequested;
            }

            let tick_start = Instant::now();
            let kind = step_world(world, fixed_dt_seconds);
            tick_timer.record_tick(tick_start.elapsed());
            ticks += 1;
            if let TickKind::SimulationOnly { .. } = kind {
                debug!(tick = ticks, "focus_frozen");
            }

            if exit_requested.get() {
                break 'frames StopReason::ExitRequested;
            }
            if tick_limit.is_some_and(|limit| ticks >= limit) {
                break 'frames StopReason::RunLengthReached;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            tick_timer.record_dropped_backlog(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if let Some(report) = tick_timer.window_report(Instant::now()) {
            info!(
                tps = report.tps,
                tick_time_ms = report.tick_time_ms,
                entity_count = world.registry().len(),
                "loop_metrics"
            );
        }
    };

    let summary = RunSummary {
        ticks,
        simulated: fixed_dt.saturating_mul(ticks.min(u32::MAX as u64) as u32),
        stop_reason,
        metrics: tick_timer.run_metrics(),
    };
    info!(
        ticks,
        simulated_ms = summary.simulated.as_millis() as u64,
        reason = ?stop_reason,
        entity_count = world.registry().len(),
        "shutdown"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
