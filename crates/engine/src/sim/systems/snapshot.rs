use std::cell::{Cell, RefCell};

use serde::Serialize;
use tracing::{info, warn};

use crate::ecs::{System, World};
use crate::math::Vec2;
use crate::sim::components::{CameraFocus, Destructible, SpatialData};

pub const DEFAULT_SNAPSHOT_INTERVAL: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusSummary {
    pub entity: String,
    pub position: Option<Vec2>,
    pub hp: Option<f32>,
}

/// Read-only digest of the world, logged as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub elapsed: f32,
    pub entity_count: usize,
    pub focus: Option<FocusSummary>,
}

impl WorldSummary {
    pub fn capture(world: &World, elapsed: f32) -> Self {
        let registry = world.registry();
        let focus = registry
            .singleton::<CameraFocus>()
            .map(|(entity, _)| FocusSummary {
                entity: entity.to_string(),
                position: registry
                    .get::<SpatialData>(entity)
                    .map(|spatial| spatial.position),
                hp: registry
                    .get::<Destructible>(entity)
                    .map(|destructible| destructible.hp.value()),
            });
        Self {
            elapsed,
            entity_count: registry.len(),
            focus,
        }
    }
}

/// Display system that periodically logs a [`WorldSummary`]. Runs on wall
/// time, so it keeps reporting while the focus is frozen.
#[derive(Debug)]
pub struct SnapshotLogSystem {
    interval: f32,
    elapsed: Cell<f32>,
    since_last: Cell<f32>,
    last: RefCell<Option<WorldSummary>>,
}

impl SnapshotLogSystem {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: Cell::new(0.0),
            since_last: Cell::new(0.0),
            last: RefCell::new(None),
        }
    }

    pub fn last(&self) -> Option<WorldSummary> {
        self.last.borrow().clone()
    }
}

impl Default for SnapshotLogSystem {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_INTERVAL)
    }
}

impl System for SnapshotLogSystem {
    fn name(&self) -> &'static str {
        "SnapshotLog"
    }

    fn update(&self, world: &mut World, dt: f32) {
        self.elapsed.set(self.elapsed.get() + dt);
        self.since_last.set(self.since_last.get() + dt);
        if self.since_last.get() < self.interval {
            return;
        }
        self.since_last.set(0.0);

        let summary = WorldSummary::capture(world, self.elapsed.get());
        match serde_json::to_string(&summary) {
            Ok(json) => info!(summary = %json, "world_snapshot"),
            Err(error) => warn!(error = %error, "world_snapshot_encode_failed"),
        }
        *self.last.borrow_mut() = Some(summary);
    }
}
