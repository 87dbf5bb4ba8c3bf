use engine::{LoopConfig, RegistryError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_config, ConfigError};
use super::scenario::{build_skirmish, Skirmish};
use super::script::ScriptedInput;

#[derive(Debug, Error)]
pub(crate) enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to seed the arena: {0}")]
    Seed(#[from] RegistryError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) skirmish: Skirmish,
    pub(crate) input: ScriptedInput,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Skirmish Startup ===");

    let config = load_config()?;
    let skirmish = build_skirmish(&config)?;
    info!(
        player = %skirmish.player,
        script_steps = config.script.len(),
        "skirmish_ready"
    );

    Ok(AppWiring {
        config: config.loop_config(),
        skirmish,
        input: ScriptedInput::new(config.script),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
