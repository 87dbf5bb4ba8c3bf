use tracing::{debug, warn};

use crate::ecs::{Entity, Registry, RegistryError, World};
use crate::math::Vec2;

use super::components::{
    AbilityList, Collidable, Condition, ConditionKind, Damage, DamageType, OnCollision, Renderable,
    RenderableKind, SpatialData, Stat, TimeOut, UNLIMITED_COLLISIONS, WHITE,
};
use super::effects::Effect;
use super::events::AbilityTrigger;

pub const PROJECTILE_Z: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub enum AbilityKind {
    /// Fires a single-hit projectile toward the target.
    Projectile {
        effect: Effect,
        speed: f32,
        radius: f32,
    },
    SelfEffect { effect: Effect },
    /// Applies an area effect centered on the target point.
    AreaAtTarget { effect: Effect },
    /// Launches a long-lived puck on press and steers it at the target on
    /// release.
    Puck {
        effect: Effect,
        speed: f32,
        radius: f32,
        lifetime: f32,
        live: Option<Entity>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ability {
    pub kind: AbilityKind,
    pub cooldown: f32,
    time_since_used: f32,
}

/// What a triggered ability asks of the world. Produced while the ability is
/// borrowed out of its owner's [`AbilityList`], executed after.
#[derive(Debug, Clone, PartialEq)]
pub enum AbilityCommand {
    SpawnProjectile {
        position: Vec2,
        velocity: Vec2,
        radius: f32,
        effect: Effect,
        collisions: i32,
        lifetime: Option<f32>,
    },
    ApplyToOwner {
        effect: Effect,
    },
    ApplyAt {
        effect: Effect,
        position: Vec2,
    },
    Redirect {
        projectile: Entity,
        target: Vec2,
        speed: f32,
    },
}

impl Ability {
    pub fn new(kind: AbilityKind, cooldown: f32) -> Self {
        Self {
            kind,
            cooldown,
            time_since_used: cooldown,
        }
    }

    pub fn projectile(effect: Effect, speed: f32, radius: f32) -> Self {
        Self::new(
            AbilityKind::Projectile {
                effect,
                speed,
                radius,
            },
            0.0,
        )
    }

    pub fn self_effect(effect: Effect) -> Self {
        Self::new(AbilityKind::SelfEffect { effect }, 0.0)
    }

    pub fn area_at_target(payload: Effect, radius: f32) -> Self {
        Self::new(
            AbilityKind::AreaAtTarget {
                effect: Effect::area_explosion(payload, radius),
            },
            0.0,
        )
    }

    pub fn puck(effect: Effect, speed: f32, radius: f32, lifetime: f32) -> Self {
        Self::new(
            AbilityKind::Puck {
                effect,
                speed,
                radius,
                lifetime,
                live: None,
            },
            0.0,
        )
    }

    pub fn with_cooldown(mut self, cooldown: f32) -> Self {
        self.cooldown = cooldown;
        self.time_since_used = cooldown;
        self
    }

    pub fn time_since_used(&self) -> f32 {
        self.time_since_used
    }

    pub fn is_usable(&self) -> bool {
        self.time_since_used >= self.cooldown
    }

    /// Advances the cooldown timer by the owner's subjective `dt`.
    pub fn update(&mut self, dt: f32) {
        self.time_since_used += dt;
    }

    pub fn on_key_down(&mut self, origin: Vec2, target: Vec2) -> Option<AbilityCommand> {
        self.time_since_used = 0.0;
        let command = match &self.kind {
            AbilityKind::Projectile {
                effect,
                speed,
                radius,
            } => AbilityCommand::SpawnProjectile {
                position: origin,
                velocity: (target - origin).truncated(*speed),
                radius: *radius,
                effect: effect.clone(),
                collisions: 1,
                lifetime: None,
            },
            AbilityKind::SelfEffect { effect } => AbilityCommand::ApplyToOwner {
                effect: effect.clone(),
            },
            AbilityKind::AreaAtTarget { effect } => AbilityCommand::ApplyAt {
                effect: effect.clone(),
                position: target,
            },
            AbilityKind::Puck {
                effect,
                speed,
                radius,
                lifetime,
                ..
            } => AbilityCommand::SpawnProjectile {
                position: origin,
                velocity: (target - origin).truncated(*speed),
                radius: *radius,
                effect: effect.clone(),
                collisions: UNLIMITED_COLLISIONS,
                lifetime: Some(*lifetime),
            },
        };
        Some(command)
    }

    pub fn on_key_up(&mut self, target: Vec2) -> Option<AbilityCommand> {
        match &mut self.kind {
            AbilityKind::Puck { speed, live, .. } => {
                live.take().map(|projectile| AbilityCommand::Redirect {
                    projectile,
                    target,
                    speed: *speed,
                })
            }
            _ => None,
        }
    }

    fn bind_spawned(&mut self, spawned: Entity) {
        if let AbilityKind::Puck { live, .. } = &mut self.kind {
            *live = Some(spawned);
        }
    }
}

/// Runs `owner`'s ability in `slot`. Key-down respects the cooldown;
/// key-up always reaches the ability so hold/release pairs complete.
pub fn trigger_ability(
    world: &mut World,
    owner: Entity,
    slot: usize,
    trigger: AbilityTrigger,
    target: Vec2,
) -> bool {
    let Some(origin) = world
        .registry()
        .get::<SpatialData>(owner)
        .map(|spatial| spatial.position)
    else {
        debug!(owner = %owner, "ability_owner_has_no_position");
        return false;
    };
    let Some(ability) = world
        .registry_mut()
        .get_mut::<AbilityList>(owner)
        .and_then(|list| list.abilities.get_mut(slot))
    else {
        debug!(owner = %owner, slot, "ability_slot_empty");
        return false;
    };

    let command = match trigger {
        AbilityTrigger::KeyDown if !ability.is_usable() => {
            debug!(owner = %owner, slot, "ability_on_cooldown");
            return false;
        }
        AbilityTrigger::KeyDown => ability.on_key_down(origin, target),
        AbilityTrigger::KeyUp => ability.on_key_up(target),
    };
    let Some(command) = command else {
        return false;
    };

    if let Some(spawned) = execute(world, owner, command) {
        if let Some(ability) = world
            .registry_mut()
            .get_mut::<AbilityList>(owner)
            .and_then(|list| list.abilities.get_mut(slot))
        {
            ability.bind_spawned(spawned);
        }
    }
    true
}

/// Applies `command` on behalf of `owner`; returns any entity it spawned.
pub fn execute(world: &mut World, owner: Entity, command: AbilityCommand) -> Option<Entity> {
    match command {
        AbilityCommand::SpawnProjectile {
            position,
            velocity,
            radius,
            effect,
            collisions,
            lifetime,
        } => {
            let mut collidable =
                Collidable::circle(radius).with_collisions_until_destroyed(collisions);
            collidable.add_ignored(owner);
            if collisions == UNLIMITED_COLLISIONS {
                collidable.ignore_repeat_collisions = true;
            }

            let mut spatial = SpatialData::moving(position, velocity);
            spatial.z = PROJECTILE_Z;
            let on_collision = OnCollision {
                owner: Some(owner),
                effects: vec![effect],
            };
            let renderable = Renderable::new(RenderableKind::Circle { radius }, WHITE);

            let registry = world.registry_mut();
            let projectile = registry.create();
            let attached = attach_projectile(
                registry,
                projectile,
                spatial,
                collidable,
                on_collision,
                renderable,
                lifetime.map(TimeOut::new),
            );
            match attached {
                Ok(()) => {
                    debug!(owner = %owner, projectile = %projectile, "projectile_spawned");
                    Some(projectile)
                }
                Err(error) => {
                    warn!(owner = %owner, error = %error, "projectile_spawn_failed");
                    registry.destroy(projectile);
                    None
                }
            }
        }
        AbilityCommand::ApplyToOwner { effect } => {
            effect.apply_to(world, owner, owner);
            None
        }
        AbilityCommand::ApplyAt { effect, position } => effect.apply_at(world, owner, position),
        AbilityCommand::Redirect {
            projectile,
            target,
            speed,
        } => {
            match world.registry_mut().get_mut::<SpatialData>(projectile) {
                Some(spatial) => {
                    spatial.velocity = (target - spatial.position).truncated(speed);
                    spatial.orientation = spatial.velocity.angle();
                }
                None => debug!(projectile = %projectile, "redirect_target_gone"),
            }
            None
        }
    }
}

fn attach_projectile(
    registry: &mut Registry,
    projectile: Entity,
    spatial: SpatialData,
    collidable: Collidable,
    on_collision: OnCollision,
    renderable: Renderable,
    timeout: Option<TimeOut>,
) -> Result<(), RegistryError> {
    registry.attach(projectile, spatial)?;
    registry.attach(projectile, collidable)?;
    registry.attach(projectile, on_collision)?;
    registry.attach(projectile, renderable)?;
    if let Some(timeout) = timeout {
        registry.attach(projectile, timeout)?;
    }
    Ok(())
}

pub fn test_projectile() -> Ability {
    Ability::projectile(
        Effect::Damage(Damage::new(DamageType::Impact, 10.0)),
        500.0,
        50.0,
    )
}

pub fn test_buff(condition: Condition) -> Ability {
    Ability::self_effect(Effect::Condition(condition))
}

pub fn test_area_effect_at_target() -> Ability {
    Ability::area_at_target(
        Effect::Condition(Condition::new(ConditionKind::Burn, 10.0, 2.0)),
        100.0,
    )
    .with_cooldown(1.0)
}

pub fn test_puck() -> Ability {
    Ability::puck(
        Effect::Damage(Damage::new(DamageType::Impact, 5.0)),
        300.0,
        15.0,
        3.0,
    )
}

/// Stops the owner's own clock for a second of wall time.
pub fn time_freeze() -> Ability {
    test_buff(
        Condition::new(ConditionKind::StatMultiply(Stat::SubjectiveTimeRate), 0.0, 1.0)
            .ignoring_subjective_time(),
    )
    .with_cooldown(5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner_with(world: &mut World, abilities: Vec<Ability>) -> Entity {
        let registry = world.registry_mut();
        let owner = registry.create();
        registry
            .attach(owner, SpatialData::at(Vec2::ZERO))
            .expect("spatial");
        registry
            .attach(owner, AbilityList::new(abilities))
            .expect("abilities");
        owner
    }

    #[test]
    fn projectile_flies_at_speed_and_ignores_owner() {
        let mut world = World::new();
        let owner = owner_with(&mut world, vec![test_projectile()]);

        assert!(trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyDown,
            Vec2::new(10.0, 0.0),
        ));

        let registry = world.registry();
        let (projectile, collidable) = registry
            .view::<&Collidable>()
            .find(|(entity, _)| *entity != owner)
            .expect("projectile");
        assert!(!collidable.can_collide(owner));
        assert_eq!(collidable.collisions_until_destroyed, 1);
        let spatial = registry.component::<SpatialData>(projectile);
        assert!((spatial.velocity.x - 500.0).abs() < 0.001);
        assert_eq!(spatial.z, PROJECTILE_Z);
        assert_eq!(
            registry.component::<OnCollision>(projectile).owner,
            Some(owner)
        );
    }

    #[test]
    fn cooldown_blocks_key_down_until_elapsed() {
        let mut ability = test_projectile().with_cooldown(1.0);
        assert!(ability.is_usable());
        ability.on_key_down(Vec2::ZERO, Vec2::new(1.0, 0.0));
        assert!(!ability.is_usable());
        ability.update(0.5);
        assert!(!ability.is_usable());
        ability.update(0.5);
        assert!(ability.is_usable());
    }

    #[test]
    fn key_down_on_cooldown_does_nothing() {
        let mut world = World::new();
        let owner = owner_with(&mut world, vec![test_projectile().with_cooldown(2.0)]);

        assert!(trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyDown,
            Vec2::new(1.0, 1.0),
        ));
        assert!(!trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyDown,
            Vec2::new(1.0, 1.0),
        ));
        assert_eq!(world.registry().len(), 2);
    }

    #[test]
    fn puck_release_redirects_live_projectile() {
        let mut world = World::new();
        let owner = owner_with(&mut world, vec![test_puck()]);

        trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyDown,
            Vec2::new(100.0, 0.0),
        );
        let puck = world
            .registry()
            .entities()
            .find(|entity| *entity != owner)
            .expect("puck");
        assert!(world.registry().has::<TimeOut>(puck));

        assert!(trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyUp,
            Vec2::new(0.0, 100.0),
        ));

        let velocity = world.registry().component::<SpatialData>(puck).velocity;
        assert!(velocity.x.abs() < 0.001);
        assert!((velocity.y - 300.0).abs() < 0.001);
        assert!(!trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyUp,
            Vec2::new(0.0, 100.0),
        ));
    }

    #[test]
    fn puck_release_after_puck_destroyed_is_harmless() {
        let mut world = World::new();
        let owner = owner_with(&mut world, vec![test_puck()]);
        trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyDown,
            Vec2::new(100.0, 0.0),
        );
        let puck = world
            .registry()
            .entities()
            .find(|entity| *entity != owner)
            .expect("puck");
        world.destroy(puck);

        assert!(trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyUp,
            Vec2::new(0.0, 100.0),
        ));
        assert_eq!(world.registry().len(), 1);
    }

    #[test]
    fn area_at_target_spawns_explosion_at_target() {
        let mut world = World::new();
        let owner = owner_with(&mut world, vec![test_area_effect_at_target()]);

        trigger_ability(
            &mut world,
            owner,
            0,
            AbilityTrigger::KeyDown,
            Vec2::new(50.0, -20.0),
        );

        let (_, spatial) = world
            .registry()
            .view::<(&SpatialData, &TimeOut)>()
            .map(|(entity, (spatial, _))| (entity, *spatial))
            .next()
            .expect("explosion");
        assert_eq!(spatial.position, Vec2::new(50.0, -20.0));
    }

    #[test]
    fn projectile_parts_on_dead_entity_report_stale_handle() {
        let mut registry = Registry::new();
        let projectile = registry.create();
        registry.destroy(projectile);

        let result = attach_projectile(
            &mut registry,
            projectile,
            SpatialData::at(Vec2::ZERO),
            Collidable::circle(5.0),
            OnCollision::default(),
            Renderable::new(RenderableKind::Circle { radius: 5.0 }, WHITE),
            Some(TimeOut::new(1.0)),
        );

        assert_eq!(
            result,
            Err(RegistryError::StaleEntity { entity: projectile })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_slot_is_ignored() {
        let mut world = World::new();
        let owner = owner_with(&mut world, vec![]);
        assert!(!trigger_ability(
            &mut world,
            owner,
            3,
            AbilityTrigger::KeyDown,
            Vec2::ZERO,
        ));
    }
}
