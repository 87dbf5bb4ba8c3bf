use std::rc::Rc;

use tracing::debug;

use crate::ecs::{Entity, EventBus, Receive, System, World};
use crate::sim::components::{
    subjective_dt, Condition, ConditionKind, Conditions, Damage, Stats,
};
use crate::sim::events::{ConditionEvent, DamagedEvent, HealedEvent};

/// Ticks timed conditions and keeps derived stats in sync with them.
#[derive(Debug, Default)]
pub struct ConditionSystem;

impl ConditionSystem {
    fn tick_entity(world: &mut World, entity: Entity, dt: f32) {
        let scaled_dt = subjective_dt(world.registry(), entity, dt);
        let count = world
            .registry()
            .get::<Conditions>(entity)
            .map_or(0, Conditions::len);

        for index in 0..count {
            let Some(condition) = world
                .registry_mut()
                .get_mut::<Conditions>(entity)
                .and_then(|conditions| conditions.get_mut(index))
            else {
                break;
            };
            let effective_dt = if condition.ignore_subjective_time {
                dt
            } else {
                scaled_dt
            };
            let step = condition.time_left.min(effective_dt);
            condition.time_left -= step;
            let ticked = *condition;
            Self::apply_tick(world, entity, &ticked, step);
        }

        let registry = world.registry_mut();
        let Some(conditions) = registry.get_mut::<Conditions>(entity) else {
            return;
        };
        let expired = conditions.remove_expired();
        let mut conditions = std::mem::take(conditions);
        if let Some(stats) = registry.get_mut::<Stats>(entity) {
            if expired || stats.dirty {
                stats.recalculate(&mut conditions);
            }
        }
        if let Some(slot) = registry.get_mut::<Conditions>(entity) {
            *slot = conditions;
        }
    }

    fn apply_tick(world: &mut World, entity: Entity, condition: &Condition, step: f32) {
        if let Some(kind) = condition.damage_type() {
            world.publish(DamagedEvent {
                source: entity,
                target: entity,
                damage: Damage::new(kind, condition.strength * step),
            });
        } else if condition.kind == ConditionKind::Regen {
            world.publish(HealedEvent {
                source: entity,
                target: entity,
                amount: condition.strength * step,
            });
        }
    }
}

impl System for ConditionSystem {
    fn name(&self) -> &'static str {
        "Condition"
    }

    fn subscribe(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe::<ConditionEvent, _>(self);
    }

    fn update(&self, world: &mut World, dt: f32) {
        for entity in world.registry().entities_with::<&Conditions>() {
            Self::tick_entity(world, entity, dt);
        }
    }
}

impl Receive<ConditionEvent> for ConditionSystem {
    fn receive(&self, world: &mut World, event: &ConditionEvent) {
        let registry = world.registry_mut();
        let Some(conditions) = registry.get_mut::<Conditions>(event.receiver) else {
            debug!(receiver = %event.receiver, "condition_without_conditions");
            return;
        };
        conditions.push(event.condition);
        if let Some(stats) = registry.get_mut::<Stats>(event.receiver) {
            stats.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::sim::abilities::{time_freeze, trigger_ability};
    use crate::sim::components::{AbilityList, Destructible, SpatialData, Stat};
    use crate::sim::events::AbilityTrigger;
    use crate::sim::systems::DestructibleSystem;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.00001,
            "expected {expected}, got {actual}"
        );
    }

    fn setup() -> (World, Rc<ConditionSystem>) {
        let mut world = World::new();
        let conditions = world.add_system(ConditionSystem);
        world.add_system(DestructibleSystem::default());
        (world, conditions)
    }

    fn apply(world: &mut World, entity: Entity, condition: Condition) {
        world.publish(ConditionEvent {
            condition,
            source: entity,
            receiver: entity,
        });
    }

    fn hp(world: &World, entity: Entity) -> f32 {
        world
            .registry()
            .component::<Destructible>(entity)
            .hp
            .value()
    }

    #[test]
    fn bleed_damages_proportionally_to_elapsed_time() {
        let (mut world, system) = setup();
        let entity = world.registry_mut().create();
        world
            .registry_mut()
            .attach(entity, Destructible::new(100.0))
            .expect("destructible");
        world
            .registry_mut()
            .attach(entity, Conditions::default())
            .expect("conditions");

        apply(
            &mut world,
            entity,
            Condition::new(ConditionKind::Bleed, 20.0, 1.0),
        );
        system.update(&mut world, 0.3);

        assert_close(hp(&world, entity), 94.0);
    }

    #[test]
    fn regen_stops_at_condition_duration() {
        let (mut world, system) = setup();
        let entity = world.registry_mut().create();
        let mut destructible = Destructible::new(100.0);
        destructible.hp.set(10.0);
        world
            .registry_mut()
            .attach(entity, destructible)
            .expect("destructible");
        world
            .registry_mut()
            .attach(entity, Conditions::default())
            .expect("conditions");

        apply(
            &mut world,
            entity,
            Condition::new(ConditionKind::Regen, 10.0, 1.0),
        );
        for expected in [13.0, 16.0, 19.0, 20.0] {
            system.update(&mut world, 0.3);
            assert_close(hp(&world, entity), expected);
        }
        system.update(&mut world, 0.1);

        assert_close(hp(&world, entity), 20.0);
        assert!(world
            .registry()
            .component::<Conditions>(entity)
            .is_empty());
    }

    #[test]
    fn stat_multiply_applies_then_expires() {
        let (mut world, system) = setup();
        let entity = world.registry_mut().create();
        world
            .registry_mut()
            .attach(entity, Stats::new(5.0, 7.0))
            .expect("stats");
        world
            .registry_mut()
            .attach(entity, Conditions::default())
            .expect("conditions");

        apply(
            &mut world,
            entity,
            Condition::new(ConditionKind::StatMultiply(Stat::Speed), 10.0, 100.0),
        );
        assert!(world.registry().component::<Stats>(entity).dirty);
        system.update(&mut world, 0.3);
        let stats = world.registry().component::<Stats>(entity);
        assert_close(stats.speed(), 50.0);
        assert_close(stats.accel(), 7.0);

        system.update(&mut world, 100.0);
        system.update(&mut world, 100.0);
        let stats = world.registry().component::<Stats>(entity);
        assert_close(stats.speed(), 5.0);
        assert_close(stats.accel(), 7.0);
    }

    #[test]
    fn zero_time_rate_locks_other_conditions_forever() {
        let (mut world, system) = setup();
        let entity = world.registry_mut().create();
        world
            .registry_mut()
            .attach(entity, Stats::new(5.0, 7.0))
            .expect("stats");
        world
            .registry_mut()
            .attach(entity, Conditions::default())
            .expect("conditions");

        let freeze = Condition::new(
            ConditionKind::StatMultiply(Stat::SubjectiveTimeRate),
            0.0,
            1.0,
        );
        let haste = Condition::new(ConditionKind::StatMultiply(Stat::Speed), 2.0, 1.0)
            .ignoring_subjective_time();
        let slow = Condition::new(ConditionKind::StatMultiply(Stat::Accel), 0.5, 1.0);
        apply(&mut world, entity, freeze);
        apply(&mut world, entity, haste);
        apply(&mut world, entity, slow);

        // The rate drops to zero at the end of the first pass, so that pass
        // still runs on the old clock.
        system.update(&mut world, 0.1);
        let stats = world.registry().component::<Stats>(entity);
        assert_close(stats.subjective_time_rate(), 0.0);
        assert_close(stats.speed(), 10.0);

        for _ in 0..10 {
            system.update(&mut world, 1_000.0);
        }

        let registry = world.registry();
        let conditions = registry.component::<Conditions>(entity);
        assert_eq!(conditions.len(), 2);
        assert!(conditions.iter().all(|c| c.kind != haste.kind));
        assert!(conditions
            .iter()
            .all(|c| (c.time_left - 0.9).abs() < 0.00001));
        let stats = registry.component::<Stats>(entity);
        assert_close(stats.subjective_time_rate(), 0.0);
        assert_close(stats.speed(), 5.0);
        assert_close(stats.accel(), 3.5);
    }

    #[test]
    fn time_freeze_expires_on_wall_time() {
        let (mut world, system) = setup();
        let caster = world.registry_mut().create();
        let registry = world.registry_mut();
        registry
            .attach(caster, SpatialData::at(Vec2::ZERO))
            .expect("spatial");
        registry
            .attach(caster, AbilityList::new(vec![time_freeze()]))
            .expect("abilities");
        registry
            .attach(caster, Stats::new(5.0, 7.0))
            .expect("stats");
        registry
            .attach(caster, Conditions::default())
            .expect("conditions");

        assert!(trigger_ability(
            &mut world,
            caster,
            0,
            AbilityTrigger::KeyDown,
            Vec2::ZERO,
        ));
        system.update(&mut world, 0.1);
        assert_close(
            world
                .registry()
                .component::<Stats>(caster)
                .subjective_time_rate(),
            0.0,
        );

        system.update(&mut world, 1.0);

        let registry = world.registry();
        assert!(registry.component::<Conditions>(caster).is_empty());
        assert_close(
            registry.component::<Stats>(caster).subjective_time_rate(),
            1.0,
        );
    }

    #[test]
    fn condition_event_without_conditions_component_is_ignored() {
        let (mut world, system) = setup();
        let entity = world.registry_mut().create();
        world
            .registry_mut()
            .attach(entity, Stats::new(5.0, 7.0))
            .expect("stats");

        apply(
            &mut world,
            entity,
            Condition::new(ConditionKind::StatAdd(Stat::Speed), 1.0, 1.0),
        );
        system.update(&mut world, 0.1);

        assert!(!world.registry().component::<Stats>(entity).dirty);
        assert_close(world.registry().component::<Stats>(entity).speed(), 5.0);
    }

    #[test]
    fn halved_time_rate_slows_damage_over_time() {
        let (mut world, system) = setup();
        let entity = world.registry_mut().create();
        world
            .registry_mut()
            .attach(entity, Destructible::new(100.0))
            .expect("destructible");
        let stats = world
            .registry_mut()
            .attach(entity, Stats::new(0.0, 0.0))
            .expect("stats");
        stats.set_base(Stat::SubjectiveTimeRate, 0.5);
        world
            .registry_mut()
            .attach(entity, Conditions::default())
            .expect("conditions");

        apply(
            &mut world,
            entity,
            Condition::new(ConditionKind::Burn, 10.0, 5.0),
        );
        system.update(&mut world, 1.0);

        assert_close(hp(&world, entity), 95.0);
        let conditions = world.registry().component::<Conditions>(entity);
        assert_close(
            conditions.iter().next().expect("burn").time_left,
            4.5,
        );
    }
}
