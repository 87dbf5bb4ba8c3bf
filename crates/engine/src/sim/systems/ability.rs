use crate::ecs::{System, World};
use crate::sim::components::{subjective_dt, AbilityList};

/// Advances ability cooldowns on each owner's own clock.
#[derive(Debug, Default)]
pub struct AbilitySystem;

impl System for AbilitySystem {
    fn name(&self) -> &'static str {
        "Ability"
    }

    fn update(&self, world: &mut World, dt: f32) {
        for entity in world.registry().entities_with::<&AbilityList>() {
            let scaled = subjective_dt(world.registry(), entity, dt);
            if let Some(list) = world.registry_mut().get_mut::<AbilityList>(entity) {
                for ability in &mut list.abilities {
                    ability.update(scaled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::sim::abilities::test_projectile;
    use crate::sim::components::{Stat, Stats};

    #[test]
    fn cooldowns_tick_on_subjective_time() {
        let mut world = World::new();
        world.add_system(AbilitySystem);
        let registry = world.registry_mut();
        let normal = registry.create();
        let slowed = registry.create();
        for entity in [normal, slowed] {
            let mut ability = test_projectile().with_cooldown(1.0);
            ability.on_key_down(Vec2::ZERO, Vec2::new(1.0, 0.0));
            registry
                .attach(entity, AbilityList::new(vec![ability]))
                .expect("abilities");
        }
        registry
            .attach(slowed, Stats::new(0.0, 0.0))
            .expect("stats")
            .set_base(Stat::SubjectiveTimeRate, 0.5);

        world.update_all(1.0);

        let registry = world.registry();
        assert!(registry.component::<AbilityList>(normal).abilities[0].is_usable());
        let slowed_ability = &registry.component::<AbilityList>(slowed).abilities[0];
        assert!(!slowed_ability.is_usable());
        assert!((slowed_ability.time_since_used() - 0.5).abs() < 0.00001);
    }
}
