use tracing::{debug, warn};

use crate::ecs::{Entity, Registry, RegistryError, World};
use crate::math::Vec2;

use super::components::{
    Collidable, Condition, Damage, OnCollision, Renderable, RenderableKind, SpatialData, TimeOut,
    ORANGE,
};
use super::events::{ConditionEvent, DamagedEvent};

pub const EXPLOSION_LIFETIME: f32 = 0.1;

/// Something that happens to an entity or a place. Abilities and collision
/// payloads are built by composing these.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Damage(Damage),
    Condition(Condition),
    /// Spawns a short-lived blast that applies `payload` once to everything
    /// it touches, sparing the source.
    AreaExplosion { payload: Box<Effect>, radius: f32 },
}

impl Effect {
    pub fn area_explosion(payload: Effect, radius: f32) -> Self {
        Effect::AreaExplosion {
            payload: Box::new(payload),
            radius,
        }
    }

    pub fn apply_to(&self, world: &mut World, source: Entity, target: Entity) {
        match self {
            Effect::Damage(damage) => world.publish(DamagedEvent {
                source,
                target,
                damage: *damage,
            }),
            Effect::Condition(condition) => world.publish(ConditionEvent {
                condition: *condition,
                source,
                receiver: target,
            }),
            Effect::AreaExplosion { .. } => {
                let Some(position) = world
                    .registry()
                    .get::<SpatialData>(target)
                    .map(|spatial| spatial.position)
                else {
                    debug!(target = %target, "area_effect_target_has_no_position");
                    return;
                };
                self.apply_at(world, source, position);
            }
        }
    }

    /// Point-targeted application. Only area effects have a meaning here;
    /// the rest need an entity and are skipped.
    pub fn apply_at(&self, world: &mut World, source: Entity, position: Vec2) -> Option<Entity> {
        match self {
            Effect::AreaExplosion { payload, radius } => spawn_explosion(
                world,
                source,
                position,
                payload.as_ref().clone(),
                *radius,
            ),
            _ => {
                debug!(source = %source, "point_effect_without_area_skipped");
                None
            }
        }
    }
}

fn spawn_explosion(
    world: &mut World,
    source: Entity,
    position: Vec2,
    payload: Effect,
    radius: f32,
) -> Option<Entity> {
    let registry = world.registry_mut();
    let explosion = registry.create();
    match attach_explosion(registry, explosion, source, position, payload, radius) {
        Ok(()) => {
            debug!(explosion = %explosion, radius, "explosion_spawned");
            Some(explosion)
        }
        Err(error) => {
            warn!(source = %source, error = %error, "explosion_spawn_failed");
            registry.destroy(explosion);
            None
        }
    }
}

fn attach_explosion(
    registry: &mut Registry,
    explosion: Entity,
    source: Entity,
    position: Vec2,
    payload: Effect,
    radius: f32,
) -> Result<(), RegistryError> {
    let mut collidable = Collidable::circle(radius);
    collidable.ignore_repeat_collisions = true;
    collidable.collides_with_tiles = false;
    if registry.contains(source) {
        collidable.add_ignored(source);
    }

    registry.attach(explosion, SpatialData::at(position))?;
    registry.attach(explosion, collidable)?;
    registry.attach(explosion, TimeOut::new(EXPLOSION_LIFETIME))?;
    registry.attach(
        explosion,
        OnCollision {
            owner: Some(source),
            effects: vec![payload],
        },
    )?;
    registry.attach(
        explosion,
        Renderable::new(RenderableKind::Circle { radius }, ORANGE),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::sim::components::{ConditionKind, DamageType};

    #[test]
    fn damage_effect_publishes_damaged_event() {
        let mut world = World::new();
        let source = world.registry_mut().create();
        let target = world.registry_mut().create();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        world
            .bus_mut()
            .on::<DamagedEvent>(move |_, event| sink.borrow_mut().push(*event));

        Effect::Damage(Damage::new(DamageType::Impact, 10.0)).apply_to(&mut world, source, target);

        assert_eq!(
            *seen.borrow(),
            vec![DamagedEvent {
                source,
                target,
                damage: Damage::new(DamageType::Impact, 10.0),
            }]
        );
    }

    #[test]
    fn condition_effect_targets_receiver() {
        let mut world = World::new();
        let source = world.registry_mut().create();
        let target = world.registry_mut().create();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        world
            .bus_mut()
            .on::<ConditionEvent>(move |_, event| sink.borrow_mut().push(event.receiver));

        Effect::Condition(Condition::new(ConditionKind::Burn, 1.0, 1.0))
            .apply_to(&mut world, source, target);

        assert_eq!(*seen.borrow(), vec![target]);
    }

    #[test]
    fn area_explosion_spawns_short_lived_blast_sparing_source() {
        let mut world = World::new();
        let source = world.registry_mut().create();
        let effect = Effect::area_explosion(
            Effect::Damage(Damage::new(DamageType::Heat, 5.0)),
            40.0,
        );

        let explosion = effect
            .apply_at(&mut world, source, Vec2::new(3.0, 4.0))
            .expect("explosion entity");

        let registry = world.registry();
        let collidable = registry.component::<Collidable>(explosion);
        assert!(collidable.ignore_repeat_collisions);
        assert!(!collidable.can_collide(source));
        assert_eq!(collidable.shape, crate::sim::Shape::Circle { radius: 40.0 });
        assert_eq!(
            registry.component::<SpatialData>(explosion).position,
            Vec2::new(3.0, 4.0)
        );
        assert_eq!(
            registry.component::<TimeOut>(explosion).time_left,
            EXPLOSION_LIFETIME
        );
        assert_eq!(
            registry.component::<OnCollision>(explosion).owner,
            Some(source)
        );
    }

    #[test]
    fn area_explosion_on_entity_without_position_is_skipped() {
        let mut world = World::new();
        let source = world.registry_mut().create();
        let target = world.registry_mut().create();

        Effect::area_explosion(Effect::Damage(Damage::new(DamageType::Heat, 5.0)), 10.0)
            .apply_to(&mut world, source, target);

        assert_eq!(world.registry().len(), 2);
    }

    #[test]
    fn explosion_parts_on_dead_entity_report_stale_handle() {
        let mut world = World::new();
        let source = world.registry_mut().create();
        let registry = world.registry_mut();
        let explosion = registry.create();
        registry.destroy(explosion);

        let result = attach_explosion(
            registry,
            explosion,
            source,
            Vec2::ZERO,
            Effect::Damage(Damage::new(DamageType::Heat, 5.0)),
            10.0,
        );

        assert_eq!(
            result,
            Err(RegistryError::StaleEntity { entity: explosion })
        );
        assert_eq!(world.registry().len(), 1);
    }
}
