use tracing::debug;

use crate::ecs::{System, World};
use crate::sim::components::{subjective_dt, TimeOut};

/// Destroys entities whose lifetime ran out, counted in subjective time.
#[derive(Debug, Default)]
pub struct TimeOutSystem;

impl System for TimeOutSystem {
    fn name(&self) -> &'static str {
        "TimeOut"
    }

    fn update(&self, world: &mut World, dt: f32) {
        let mut expired = Vec::new();
        for entity in world.registry().entities_with::<&TimeOut>() {
            let scaled = subjective_dt(world.registry(), entity, dt);
            let Some(timeout) = world.registry_mut().get_mut::<TimeOut>(entity) else {
                continue;
            };
            timeout.time_left -= scaled;
            if timeout.is_expired() {
                expired.push(entity);
            }
        }
        let destroyed = world.destroy_all(expired);
        if destroyed > 0 {
            debug!(destroyed, "timeouts_expired");
        }
    }
}
