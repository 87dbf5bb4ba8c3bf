use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::ecs::{DestroyQueue, EventBus, Receive, System, World};
use crate::sim::components::{Destructible, Stat, Stats};
use crate::sim::events::{DamagedEvent, HealedEvent};

/// HP bookkeeping. Deaths are collected while events arrive and destroyed
/// on this system's next update.
#[derive(Debug, Default)]
pub struct DestructibleSystem {
    to_destroy: RefCell<DestroyQueue>,
}

impl DestructibleSystem {
    pub fn pending_deaths(&self) -> usize {
        self.to_destroy.borrow().len()
    }
}

impl System for DestructibleSystem {
    fn name(&self) -> &'static str {
        "Destructible"
    }

    fn subscribe(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe::<DamagedEvent, _>(Rc::clone(&self));
        bus.subscribe::<HealedEvent, _>(self);
    }

    fn update(&self, world: &mut World, _dt: f32) {
        let doomed = self.to_destroy.borrow_mut().drain();
        let destroyed = world.destroy_all(doomed);
        if destroyed > 0 {
            debug!(destroyed, "destructibles_destroyed");
        }
    }
}

impl Receive<DamagedEvent> for DestructibleSystem {
    fn receive(&self, world: &mut World, event: &DamagedEvent) {
        let registry = world.registry_mut();
        let scale = registry.get::<Stats>(event.target).map_or(1.0, |stats| {
            stats.get(event.damage.kind.vulnerability_stat()) * stats.get(Stat::Vulnerability)
        });
        let Some(destructible) = registry.get_mut::<Destructible>(event.target) else {
            return;
        };
        if !destructible.indestructible {
            destructible.hp.sub(event.damage.amount * scale);
        }
        if destructible.is_dead() {
            self.to_destroy.borrow_mut().schedule(event.target);
        }
    }
}

impl Receive<HealedEvent> for DestructibleSystem {
    fn receive(&self, world: &mut World, event: &HealedEvent) {
        let Some(destructible) = world.registry_mut().get_mut::<Destructible>(event.target) else {
            return;
        };
        if destructible.healable {
            destructible.hp.add(event.amount);
        }
    }
}
