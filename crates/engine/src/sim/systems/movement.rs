use crate::ecs::{System, World};
use crate::sim::components::SpatialData;
use crate::sim::events::MovedEvent;

/// Integrates velocity and reports every entity that moved.
#[derive(Debug, Default)]
pub struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "Movement"
    }

    fn update(&self, world: &mut World, dt: f32) {
        for entity in world.registry().entities_with::<&SpatialData>() {
            let Some(spatial) = world.registry_mut().get_mut::<SpatialData>(entity) else {
                continue;
            };
            let old_position = spatial.position;
            spatial.position += spatial.velocity * dt;
            if !spatial.is_moving() {
                spatial.time_moving = 0.0;
                continue;
            }
            spatial.time_moving += dt;
            let new_position = spatial.position;
            world.publish(MovedEvent {
                entity,
                old_position,
                new_position,
            });
        }
    }
}
