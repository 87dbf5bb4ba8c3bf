use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::sim::InputEvent;
use engine::LoopConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub(crate) const CONFIG_ENV_VAR: &str = "SKIRMISH_CONFIG";
pub(crate) const RUN_SECONDS_ENV_VAR: &str = "SKIRMISH_RUN_SECONDS";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config '{path}' at {at}: {source}")]
    Parse {
        path: PathBuf,
        at: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("SKIRMISH_RUN_SECONDS must be a positive number of seconds, got '{value}'")]
    InvalidRunSeconds { value: String },
    #[error("invalid config value at {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ArenaConfig {
    pub(crate) tile_width: f32,
    /// Tiles span `-tile_extent..tile_extent` on both axes.
    pub(crate) tile_extent: i32,
    /// Every row and column whose index is 5 mod this value is a wall.
    pub(crate) wall_spacing: i32,
    pub(crate) dummy_rows: u32,
    pub(crate) dummy_columns: u32,
    pub(crate) dummy_spacing: f32,
    pub(crate) dummy_hp: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tile_width: 100.0,
            tile_extent: 100,
            wall_spacing: 10,
            dummy_rows: 8,
            dummy_columns: 8,
            dummy_spacing: 100.0,
            dummy_hp: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptStep {
    pub(crate) tick: u64,
    pub(crate) event: InputEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SkirmishConfig {
    pub(crate) target_tps: u32,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) run_seconds: Option<f32>,
    pub(crate) realtime: bool,
    pub(crate) collision_grid_width: f32,
    pub(crate) snapshot_interval: f32,
    pub(crate) arena: ArenaConfig,
    pub(crate) script: Vec<ScriptStep>,
}

impl Default for SkirmishConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks_per_frame: 5,
            run_seconds: Some(10.0),
            realtime: false,
            collision_grid_width: engine::sim::systems::DEFAULT_GRID_WIDTH,
            snapshot_interval: engine::sim::systems::DEFAULT_SNAPSHOT_INTERVAL,
            arena: ArenaConfig::default(),
            script: super::script::demo_script(),
        }
    }
}

impl SkirmishConfig {
    pub(crate) fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            target_tps: self.target_tps,
            max_ticks_per_frame: self.max_ticks_per_frame,
            run_for: self.run_seconds.map(Duration::from_secs_f32),
            realtime: self.realtime,
            ..LoopConfig::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.target_tps == 0 {
            return Err(invalid("target_tps", "must be at least 1"));
        }
        if let Some(seconds) = self.run_seconds {
            if !(seconds.is_finite() && seconds > 0.0) {
                return Err(invalid("run_seconds", format!("expected > 0, got {seconds}")));
            }
        }
        if !(self.collision_grid_width.is_finite() && self.collision_grid_width > 0.0) {
            return Err(invalid(
                "collision_grid_width",
                format!("expected > 0, got {}", self.collision_grid_width),
            ));
        }
        if !(self.snapshot_interval.is_finite() && self.snapshot_interval > 0.0) {
            return Err(invalid(
                "snapshot_interval",
                format!("expected > 0, got {}", self.snapshot_interval),
            ));
        }
        if !(self.arena.tile_width.is_finite() && self.arena.tile_width > 0.0) {
            return Err(invalid(
                "arena.tile_width",
                format!("expected > 0, got {}", self.arena.tile_width),
            ));
        }
        if !(self.arena.dummy_hp.is_finite() && self.arena.dummy_hp > 0.0) {
            return Err(invalid(
                "arena.dummy_hp",
                format!("expected > 0, got {}", self.arena.dummy_hp),
            ));
        }
        if !self.arena.dummy_spacing.is_finite() {
            return Err(invalid(
                "arena.dummy_spacing",
                format!("expected a finite distance, got {}", self.arena.dummy_spacing),
            ));
        }
        if self.arena.wall_spacing <= 0 {
            return Err(invalid(
                "arena.wall_spacing",
                format!("expected > 0, got {}", self.arena.wall_spacing),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

pub(crate) fn load_config() -> Result<SkirmishConfig, ConfigError> {
    resolve_config(
        std::env::var(CONFIG_ENV_VAR).ok().as_deref(),
        std::env::var(RUN_SECONDS_ENV_VAR).ok().as_deref(),
    )
}

/// Builds the effective config from the raw environment values. A missing
/// config path, or a path that does not exist, yields the defaults.
pub(crate) fn resolve_config(
    config_path: Option<&str>,
    run_seconds: Option<&str>,
) -> Result<SkirmishConfig, ConfigError> {
    let mut config = match config_path.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            let path = Path::new(raw);
            if path.is_file() {
                let config = read_config_file(path)?;
                info!(path = %path.display(), "config_loaded");
                config
            } else {
                info!(path = %path.display(), "config_missing_using_defaults");
                SkirmishConfig::default()
            }
        }
        None => SkirmishConfig::default(),
    };

    if let Some(raw) = run_seconds {
        config.run_seconds = Some(parse_run_seconds(raw)?);
    }
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<SkirmishConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(&raw, path)
}

fn parse_config_json(raw: &str, path: &Path) -> Result<SkirmishConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SkirmishConfig>(&mut deserializer).map_err(|error| {
        let at = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            at,
            source: error.into_inner(),
        }
    })
}

fn parse_run_seconds(raw: &str) -> Result<f32, ConfigError> {
    match raw.trim().parse::<f32>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => Ok(seconds),
        _ => Err(ConfigError::InvalidRunSeconds {
            value: raw.to_string(),
        }),
    }
}
