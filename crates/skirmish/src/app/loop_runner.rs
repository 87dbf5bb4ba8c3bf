use std::process::ExitCode;

use engine::{run_world, StopReason};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(mut app: AppWiring) -> ExitCode {
    let summary = match run_world(&app.config, &mut app.skirmish.world, &mut app.input) {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "run_failed");
            return ExitCode::FAILURE;
        }
    };

    let registry = app.skirmish.world.registry();
    let player_alive = registry.contains(app.skirmish.player);
    info!(
        ticks = summary.ticks,
        quit = summary.stop_reason == StopReason::ExitRequested,
        player_alive,
        unplayed_steps = app.input.remaining(),
        entity_count = registry.len(),
        mean_tick_time_ms = summary.metrics.mean_tick_time_ms,
        slowest_tick_ms = summary.metrics.slowest_tick_ms,
        dropped_backlog_ms = summary.metrics.dropped_backlog.as_millis() as u64,
        "skirmish_finished"
    );
    ExitCode::SUCCESS
}
