use engine::ecs::{Entity, RegistryError, World};
use engine::math::{Vec2, Vec2i};
use engine::sim::abilities::{test_projectile, test_puck};
use engine::sim::components::{GREY, WHITE};
use engine::sim::systems::{
    AbilitySystem, CollisionHandlerSystem, CollisionSystem, ConditionSystem, ControlSystem,
    DestructibleSystem, InputSystem, MovementSystem, SnapshotLogSystem, TimeOutSystem,
};
use engine::sim::{
    AbilityList, CameraFocus, Collidable, Conditions, Controllable, Destructible, Renderable,
    RenderableKind, SpatialData, Stats, Tile, TileLayout,
};
use tracing::info;

use super::config::{ArenaConfig, SkirmishConfig};

pub(crate) const PLAYER_SPEED: f32 = 133.0;
pub(crate) const PLAYER_ACCEL: f32 = 40.0;
pub(crate) const PLAYER_HP: f32 = 50.0;
pub(crate) const BODY_RADIUS: f32 = 20.0;

pub(crate) struct Skirmish {
    pub(crate) world: World,
    pub(crate) player: Entity,
}

/// Registers the systems in pipeline order and seeds the arena.
pub(crate) fn build_skirmish(config: &SkirmishConfig) -> Result<Skirmish, RegistryError> {
    let mut world = World::new();
    world.add_system(MovementSystem);
    world.add_system(CollisionSystem::new(config.collision_grid_width));
    world.add_system(DestructibleSystem::default());
    world.add_system(InputSystem::default());
    world.add_system(ControlSystem);
    world.add_system(ConditionSystem);
    world.add_system(CollisionHandlerSystem);
    world.add_system(AbilitySystem);
    world.add_system(TimeOutSystem);
    world.add_display_system(SnapshotLogSystem::new(config.snapshot_interval));

    let walls = spawn_tiles(&mut world, &config.arena)?;
    let player = spawn_player(&mut world)?;
    let dummies = spawn_dummies(&mut world, &config.arena)?;
    info!(
        entity_count = world.registry().len(),
        walls,
        dummies,
        "scene_loaded"
    );

    Ok(Skirmish { world, player })
}

fn spawn_tiles(world: &mut World, arena: &ArenaConfig) -> Result<usize, RegistryError> {
    let mut layout = TileLayout::new(arena.tile_width);
    for x in -arena.tile_extent..arena.tile_extent {
        for y in -arena.tile_extent..arena.tile_extent {
            if is_wall(x, arena.wall_spacing) || is_wall(y, arena.wall_spacing) {
                layout.set(Vec2i::new(x, y), Tile { collides: true });
            }
        }
    }
    let walls = layout.len();

    let registry = world.registry_mut();
    let entity = registry.create();
    registry.attach(entity, layout)?;
    Ok(walls)
}

// `%` keeps the dividend's sign, so negative indices never land on a wall.
fn is_wall(index: i32, spacing: i32) -> bool {
    index % spacing == 5
}

fn spawn_player(world: &mut World) -> Result<Entity, RegistryError> {
    let registry = world.registry_mut();
    let player = registry.create();
    registry.attach(player, SpatialData::at(Vec2::ZERO))?;
    registry.attach(player, Renderable::new(RenderableKind::Person, WHITE))?;
    registry.attach(player, Destructible::new(PLAYER_HP))?;
    registry.attach(player, Controllable)?;
    registry.attach(player, Collidable::circle(BODY_RADIUS))?;
    registry.attach(player, Conditions::default())?;
    registry.attach(player, Stats::new(PLAYER_SPEED, PLAYER_ACCEL))?;
    registry.attach(
        player,
        AbilityList::new(vec![test_projectile(), test_puck()]),
    )?;
    registry.attach(player, CameraFocus)?;
    Ok(player)
}

/// Lays out a diamond of stationary targets in front of the player.
fn spawn_dummies(world: &mut World, arena: &ArenaConfig) -> Result<u32, RegistryError> {
    let registry = world.registry_mut();
    for i in 0..arena.dummy_rows {
        for j in 0..arena.dummy_columns {
            let (i, j) = (i as f32, j as f32);
            let position = Vec2::new(i - j + 1.0, j + i + 1.0) * arena.dummy_spacing;

            let dummy = registry.create();
            registry.attach(dummy, SpatialData::at(position))?;
            registry.attach(dummy, Renderable::new(RenderableKind::Person, GREY))?;
            registry.attach(dummy, Destructible::new(arena.dummy_hp))?;
            registry.attach(dummy, Collidable::circle(BODY_RADIUS))?;
            registry.attach(dummy, Conditions::default())?;
            registry.attach(dummy, Stats::new(0.0, 0.0))?;
        }
    }
    Ok(arena.dummy_rows * arena.dummy_columns)
}

#[cfg(test)]
mod tests {
    use engine::sim::InputAction;
    use engine::sim::InputEvent;
    use engine::{run_world, StopReason};

    use super::*;
    use crate::app::config::ScriptStep;
    use crate::app::script::ScriptedInput;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.0001,
            "expected {expected}, got {actual}"
        );
    }

    fn small_config() -> SkirmishConfig {
        SkirmishConfig {
            run_seconds: Some(1.0),
            arena: ArenaConfig {
                tile_extent: 20,
                dummy_rows: 2,
                dummy_columns: 2,
                ..ArenaConfig::default()
            },
            script: Vec::new(),
            ..SkirmishConfig::default()
        }
    }

    #[test]
    fn systems_register_in_pipeline_order() {
        let skirmish = build_skirmish(&small_config()).expect("skirmish");
        assert_eq!(
            skirmish.world.system_names(),
            vec![
                "Movement",
                "Collision",
                "Destructible",
                "Input",
                "Control",
                "Condition",
                "CollisionHandler",
                "Ability",
                "TimeOut",
                "SnapshotLog",
            ]
        );
    }

    #[test]
    fn default_arena_seeds_player_dummies_and_tiles() {
        let skirmish = build_skirmish(&SkirmishConfig::default()).expect("skirmish");
        let registry = skirmish.world.registry();

        assert_eq!(registry.len(), 1 + 1 + 64);
        let (focus, _) = registry.singleton::<CameraFocus>().expect("focus");
        assert_eq!(focus, skirmish.player);
        assert_close(registry.component::<Stats>(focus).speed(), PLAYER_SPEED);
        assert_eq!(
            registry.component::<AbilityList>(focus).abilities.len(),
            2
        );

        let (_, layout) = registry.singleton::<TileLayout>().expect("tiles");
        assert!(layout.get(Vec2i::new(5, -37)).is_some_and(|tile| tile.collides));
        assert!(layout.get(Vec2i::new(-5, 0)).is_none());
        assert!(layout.get(Vec2i::new(0, 0)).is_none());

        let nearest = registry
            .view::<(&SpatialData, &Destructible)>()
            .filter(|(entity, _)| *entity != focus)
            .map(|(_, (spatial, _))| spatial.position)
            .find(|position| *position == Vec2::new(100.0, 100.0));
        assert!(nearest.is_some());
    }

    #[test]
    fn projectile_at_nearest_dummy_deals_damage() {
        let config = small_config();
        let mut skirmish = build_skirmish(&config).expect("skirmish");
        let target = skirmish
            .world
            .registry()
            .view::<&SpatialData>()
            .find(|(_, spatial)| spatial.position == Vec2::new(100.0, 100.0))
            .map(|(entity, _)| entity)
            .expect("dummy");
        let mut input = ScriptedInput::new(vec![
            ScriptStep {
                tick: 0,
                event: InputEvent::CursorMoved(Vec2::new(100.0, 100.0)),
            },
            ScriptStep {
                tick: 1,
                event: InputEvent::Pressed(InputAction::Ability1),
            },
        ]);

        let summary =
            run_world(&config.loop_config(), &mut skirmish.world, &mut input).expect("run");

        assert_eq!(summary.stop_reason, StopReason::RunLengthReached);
        assert_eq!(summary.metrics.ticks_timed, summary.ticks);
        assert_eq!(summary.ticks, 60);
        let registry = skirmish.world.registry();
        assert_close(registry.component::<Destructible>(target).hp.value(), 40.0);
        assert_eq!(registry.len(), 1 + 1 + 4);
    }

    #[test]
    fn walking_into_a_wall_stops_the_player() {
        let config = SkirmishConfig {
            run_seconds: Some(8.0),
            ..small_config()
        };
        let mut skirmish = build_skirmish(&config).expect("skirmish");
        let mut input = ScriptedInput::new(vec![ScriptStep {
            tick: 0,
            event: InputEvent::Pressed(InputAction::MoveRight),
        }]);

        run_world(&config.loop_config(), &mut skirmish.world, &mut input).expect("run");

        let position = skirmish
            .world
            .registry()
            .component::<SpatialData>(skirmish.player)
            .position;
        // Moving right heads toward +x, -y; the first wall column is x = 5.
        assert!(position.x < 500.0 - BODY_RADIUS + 1.0);
        assert!(position.x > 300.0);
    }
}
