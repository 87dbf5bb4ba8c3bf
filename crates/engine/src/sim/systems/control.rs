use std::rc::Rc;

use tracing::debug;

use crate::ecs::{EventBus, Receive, System, World};
use crate::math::Vec2;
use crate::sim::abilities::trigger_ability;
use crate::sim::components::{SpatialData, Stats};
use crate::sim::events::{ControlMoveAccelEvent, ControlUseAbilityEvent};

/// Below this speed an entity with no input stops outright.
pub const STOP_SPEED: f32 = 1.0;

/// Turns control intents into velocity changes and ability activations.
#[derive(Debug, Default)]
pub struct ControlSystem;

impl System for ControlSystem {
    fn name(&self) -> &'static str {
        "Control"
    }

    fn subscribe(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe::<ControlMoveAccelEvent, _>(Rc::clone(&self));
        bus.subscribe::<ControlUseAbilityEvent, _>(self);
    }

    fn update(&self, _world: &mut World, _dt: f32) {}
}

impl Receive<ControlMoveAccelEvent> for ControlSystem {
    fn receive(&self, world: &mut World, event: &ControlMoveAccelEvent) {
        let registry = world.registry_mut();
        let Some((speed, accel_rate)) = registry
            .get::<Stats>(event.entity)
            .map(|stats| (stats.speed(), stats.accel()))
        else {
            debug!(entity = %event.entity, "move_without_stats");
            return;
        };
        let Some(spatial) = registry.get_mut::<SpatialData>(event.entity) else {
            debug!(entity = %event.entity, "move_without_spatial_data");
            return;
        };

        let accel = event.accel.normalized() * accel_rate;
        spatial.velocity += accel;
        if !spatial.velocity.is_zero() {
            spatial.orientation = spatial.velocity.angle();
        }
        // Drag that caps the steady-state speed at `speed`.
        let total = speed + accel_rate;
        if total > 0.0 {
            spatial.velocity *= speed / total;
        }
        if accel.is_zero() && spatial.velocity.length() < STOP_SPEED {
            spatial.velocity = Vec2::ZERO;
        }
    }
}

impl Receive<ControlUseAbilityEvent> for ControlSystem {
    fn receive(&self, world: &mut World, event: &ControlUseAbilityEvent) {
        let used = trigger_ability(
            world,
            event.entity,
            event.ability,
            event.trigger,
            event.target,
        );
        debug!(
            entity = %event.entity,
            ability = event.ability,
            trigger = ?event.trigger,
            used,
            "ability_requested"
        );
    }
}
