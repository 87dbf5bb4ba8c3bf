use std::time::{Duration, Instant};

/// Tick timing over one reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    /// Mean wall time spent inside one world tick.
    pub tick_time_ms: f32,
}

/// Tick timing over a whole run, returned with the [`RunSummary`].
///
/// [`RunSummary`]: super::RunSummary
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunMetrics {
    pub ticks_timed: u64,
    pub mean_tick_time_ms: f32,
    pub slowest_tick_ms: f32,
    /// Simulated time discarded because a frame hit the tick cap.
    pub dropped_backlog: Duration,
}

/// Times world ticks, reporting per window and accumulating run totals.
#[derive(Debug)]
pub(crate) struct TickTimer {
    window_start: Instant,
    window: Duration,
    window_ticks: u32,
    window_busy: Duration,
    total_ticks: u64,
    total_busy: Duration,
    slowest: Duration,
    dropped_backlog: Duration,
}

impl TickTimer {
    pub(crate) fn new(window: Duration, now: Instant) -> Self {
        Self {
            window_start: now,
            window,
            window_ticks: 0,
            window_busy: Duration::ZERO,
            total_ticks: 0,
            total_busy: Duration::ZERO,
            slowest: Duration::ZERO,
            dropped_backlog: Duration::ZERO,
        }
    }

    pub(crate) fn record_tick(&mut self, busy: Duration) {
        self.window_ticks = self.window_ticks.saturating_add(1);
        self.window_busy = self.window_busy.saturating_add(busy);
        self.total_ticks = self.total_ticks.saturating_add(1);
        self.total_busy = self.total_busy.saturating_add(busy);
        self.slowest = self.slowest.max(busy);
    }

    pub(crate) fn record_dropped_backlog(&mut self, dropped: Duration) {
        self.dropped_backlog = self.dropped_backlog.saturating_add(dropped);
    }

    /// Closes the current window once it has lasted at least the configured
    /// interval.
    pub(crate) fn window_report(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let report = LoopMetricsSnapshot {
            tps: self.window_ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON),
            tick_time_ms: mean_ms(self.window_busy, self.window_ticks as u64),
        };
        self.window_start = now;
        self.window_ticks = 0;
        self.window_busy = Duration::ZERO;
        Some(report)
    }

    pub(crate) fn run_metrics(&self) -> RunMetrics {
        RunMetrics {
            ticks_timed: self.total_ticks,
            mean_tick_time_ms: mean_ms(self.total_busy, self.total_ticks),
            slowest_tick_ms: self.slowest.as_secs_f32() * 1000.0,
            dropped_backlog: self.dropped_backlog,
        }
    }
}

fn mean_ms(busy: Duration, ticks: u64) -> f32 {
    if ticks == 0 {
        0.0
    } else {
        busy.as_secs_f32() * 1000.0 / ticks as f32
    }
}
