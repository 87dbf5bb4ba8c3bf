use std::rc::Rc;

use crate::ecs::{Entity, EventBus, Receive, System, World};
use crate::sim::components::OnCollision;
use crate::sim::events::CollidedEvent;

/// Applies collision payloads. Each side of a collision gets the other
/// side's `OnCollision` effects.
#[derive(Debug, Default)]
pub struct CollisionHandlerSystem;

impl CollisionHandlerSystem {
    fn handle(world: &mut World, source: Entity, target: Entity) {
        let Some(on_collision) = world.registry().get::<OnCollision>(source) else {
            return;
        };
        let owner = on_collision.owner.unwrap_or(source);
        let effects = on_collision.effects.clone();
        for effect in &effects {
            effect.apply_to(world, owner, target);
        }
    }
}

impl System for CollisionHandlerSystem {
    fn name(&self) -> &'static str {
        "CollisionHandler"
    }

    fn subscribe(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe::<CollidedEvent, _>(self);
    }

    fn update(&self, _world: &mut World, _dt: f32) {}
}

impl Receive<CollidedEvent> for CollisionHandlerSystem {
    fn receive(&self, world: &mut World, event: &CollidedEvent) {
        Self::handle(world, event.one, event.two);
        Self::handle(world, event.two, event.one);
    }
}
