use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::ecs::{
    DestroyQueue, Entity, EntityDestroyedEvent, EventBus, Receive, Registry, System, World,
};
use crate::math::{Vec2, Vec2i};
use crate::sim::components::{Collidable, Shape, SpatialData, TileLayout};
use crate::sim::events::{CollidedEvent, MovedEvent};

pub const DEFAULT_GRID_WIDTH: f32 = 500.0;
/// Tile push-back step, as a fraction of the tile width.
pub const TILE_STEP_FRACTION: f32 = 0.01;
pub const MAX_TILE_RESOLUTION_STEPS: u32 = 1_000;

/// Forward neighbours scanned from every occupied cell. Together with the
/// in-cell pass each adjacent pair of cells is visited exactly once.
const NEIGHBOR_OFFSETS: [Vec2i; 4] = [
    Vec2i::new(0, 1),
    Vec2i::new(1, -1),
    Vec2i::new(1, 0),
    Vec2i::new(1, 1),
];

#[derive(Debug, Default)]
struct CollisionState {
    hash: BTreeMap<Vec2i, BTreeSet<Entity>>,
    cells: HashMap<Entity, Vec2i>,
    relocations: BTreeSet<Entity>,
    to_destroy: DestroyQueue,
}

impl CollisionState {
    fn watch(&mut self, entity: Entity, cell: Vec2i) {
        self.hash.entry(cell).or_default().insert(entity);
        self.cells.insert(entity, cell);
    }

    fn unwatch(&mut self, entity: Entity) {
        if let Some(cell) = self.cells.remove(&entity) {
            if let Some(members) = self.hash.get_mut(&cell) {
                members.remove(&entity);
                if members.is_empty() {
                    self.hash.remove(&cell);
                }
            }
        }
        self.relocations.remove(&entity);
    }

    fn relocate(&mut self, entity: Entity, cell: Vec2i) {
        match self.cells.get(&entity).copied() {
            Some(current) if current == cell => {}
            Some(_) => {
                self.unwatch(entity);
                self.watch(entity, cell);
            }
            None => {}
        }
    }

    fn candidate_pairs(&self) -> Vec<(Entity, Entity)> {
        let mut pairs = Vec::new();
        for (cell, members) in &self.hash {
            for (offset, first) in members.iter().enumerate() {
                for second in members.iter().skip(offset + 1) {
                    pairs.push((*first, *second));
                }
            }
            for neighbor_offset in NEIGHBOR_OFFSETS {
                let Some(neighbors) = self.hash.get(&(*cell + neighbor_offset)) else {
                    continue;
                };
                for first in members {
                    for second in neighbors {
                        pairs.push((*first, *second));
                    }
                }
            }
        }
        pairs
    }
}

/// Spatial-hash broad phase, shape narrow phase, static tile resolution and
/// collision-count lifetimes.
#[derive(Debug)]
pub struct CollisionSystem {
    grid_width: f32,
    state: RefCell<CollisionState>,
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_WIDTH)
    }
}

impl CollisionSystem {
    pub fn new(grid_width: f32) -> Self {
        Self {
            grid_width,
            state: RefCell::new(CollisionState::default()),
        }
    }

    pub fn grid_width(&self) -> f32 {
        self.grid_width
    }

    pub fn grid_coords(&self, position: Vec2) -> Vec2i {
        position.floor_div(self.grid_width)
    }

    pub fn is_watching(&self, entity: Entity) -> bool {
        self.state.borrow().cells.contains_key(&entity)
    }

    pub fn watched_cell(&self, entity: Entity) -> Option<Vec2i> {
        self.state.borrow().cells.get(&entity).copied()
    }

    pub fn watched_count(&self) -> usize {
        self.state.borrow().cells.len()
    }

    /// Geometric overlap test. Never true for an entity against itself or
    /// for entities missing position or shape.
    pub fn collides(registry: &Registry, one: Entity, two: Entity) -> bool {
        if one == two {
            return false;
        }
        let (Some(spatial1), Some(collidable1), Some(spatial2), Some(collidable2)) = (
            registry.get::<SpatialData>(one),
            registry.get::<Collidable>(one),
            registry.get::<SpatialData>(two),
            registry.get::<Collidable>(two),
        ) else {
            return false;
        };
        shapes_overlap(
            collidable1.shape,
            spatial1.position,
            collidable2.shape,
            spatial2.position,
        )
    }

    fn count_down_cooldowns(world: &mut World, dt: f32) {
        for entity in world.registry().entities_with::<&Collidable>() {
            if let Some(collidable) = world.registry_mut().get_mut::<Collidable>(entity) {
                if collidable.time_until_collidable > 0.0 {
                    collidable.time_until_collidable -= dt;
                }
            }
        }
    }

    fn sync_hash(&self, registry: &Registry) {
        let mut state = self.state.borrow_mut();

        let stale: Vec<Entity> = state
            .cells
            .keys()
            .copied()
            .filter(|entity| {
                !registry.has::<SpatialData>(*entity) || !registry.has::<Collidable>(*entity)
            })
            .collect();
        for entity in stale {
            state.unwatch(entity);
        }

        for (entity, (spatial, _)) in registry.view::<(&SpatialData, &Collidable)>() {
            if !state.cells.contains_key(&entity) {
                let cell = self.grid_coords(spatial.position);
                state.watch(entity, cell);
            }
        }

        let relocations = std::mem::take(&mut state.relocations);
        for entity in relocations {
            if let Some(spatial) = registry.get::<SpatialData>(entity) {
                let cell = self.grid_coords(spatial.position);
                state.relocate(entity, cell);
            }
        }
    }

    fn resolve_tile_collision(&self, world: &mut World, entity: Entity) {
        let registry = world.registry();
        let (Some(spatial), Some(collidable)) = (
            registry.get::<SpatialData>(entity),
            registry.get::<Collidable>(entity),
        ) else {
            return;
        };
        if !collidable.collides_with_tiles {
            return;
        }
        let Some((_, layout)) = registry.singleton::<TileLayout>() else {
            return;
        };
        if !overlaps_any_tile(layout, collidable.shape, spatial.position) {
            return;
        }

        let step = spatial
            .velocity
            .truncated(layout.tile_width * TILE_STEP_FRACTION);
        let mut position = spatial.position;
        let mut steps = 0u32;
        if !step.is_zero() {
            while overlaps_any_tile(layout, collidable.shape, position)
                && steps < MAX_TILE_RESOLUTION_STEPS
            {
                position -= step;
                steps += 1;
            }
        }
        if steps == MAX_TILE_RESOLUTION_STEPS {
            warn!(entity = %entity, steps, "tile_resolution_step_cap_hit");
        }

        if let Some(spatial) = world.registry_mut().get_mut::<SpatialData>(entity) {
            spatial.position = position;
            spatial.velocity = Vec2::ZERO;
        }
        debug!(entity = %entity, steps, "tile_collision_resolved");

        let wall = world.registry_mut().create();
        world.publish(CollidedEvent {
            one: entity,
            two: wall,
        });
        world.destroy(wall);
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "Collision"
    }

    fn subscribe(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe::<MovedEvent, _>(Rc::clone(&self));
        bus.subscribe::<EntityDestroyedEvent, _>(Rc::clone(&self));
        bus.subscribe::<CollidedEvent, _>(self);
    }

    fn update(&self, world: &mut World, dt: f32) {
        Self::count_down_cooldowns(world, dt);
        self.sync_hash(world.registry());

        let pairs = self.state.borrow().candidate_pairs();
        for (one, two) in pairs {
            let registry = world.registry();
            if !Self::collides(registry, one, two) {
                continue;
            }
            let consent = registry.component::<Collidable>(one).can_collide(two)
                && registry.component::<Collidable>(two).can_collide(one);
            if consent {
                world.publish(CollidedEvent { one, two });
            }
        }

        let doomed = self.state.borrow_mut().to_destroy.drain();
        world.destroy_all(doomed);
    }
}

impl Receive<MovedEvent> for CollisionSystem {
    fn receive(&self, world: &mut World, event: &MovedEvent) {
        self.state.borrow_mut().relocations.insert(event.entity);
        self.resolve_tile_collision(world, event.entity);
    }
}

impl Receive<EntityDestroyedEvent> for CollisionSystem {
    fn receive(&self, _world: &mut World, event: &EntityDestroyedEvent) {
        let mut state = self.state.borrow_mut();
        state.unwatch(event.entity);
        state.to_destroy.cancel(event.entity);
    }
}

impl Receive<CollidedEvent> for CollisionSystem {
    fn receive(&self, world: &mut World, event: &CollidedEvent) {
        let sides = [(event.one, event.two), (event.two, event.one)];
        for (this, other) in sides {
            let Some(collidable) = world.registry_mut().get_mut::<Collidable>(this) else {
                continue;
            };
            if collidable.ignore_repeat_collisions {
                collidable.add_ignored(other);
            }
            if collidable.record_collision() {
                self.state.borrow_mut().to_destroy.schedule(this);
            }
        }
    }
}

pub fn shapes_overlap(shape1: Shape, position1: Vec2, shape2: Shape, position2: Vec2) -> bool {
    match (shape1, shape2) {
        (Shape::Circle { radius: r1 }, Shape::Circle { radius: r2 }) => {
            position1.distance(position2) < r1 + r2
        }
        (Shape::Circle { radius }, rectangle @ Shape::Rectangle { .. }) => {
            circle_rectangle_overlap(position1, radius, rectangle, position2)
        }
        (rectangle @ Shape::Rectangle { .. }, Shape::Circle { radius }) => {
            circle_rectangle_overlap(position2, radius, rectangle, position1)
        }
        (Shape::Rectangle { .. }, Shape::Rectangle { .. }) => {
            let (min1, max1) = shape1.bounds(position1);
            let (min2, max2) = shape2.bounds(position2);
            min1.x < max2.x && min2.x < max1.x && min1.y < max2.y && min2.y < max1.y
        }
    }
}

fn circle_rectangle_overlap(center: Vec2, radius: f32, rectangle: Shape, corner: Vec2) -> bool {
    let (min, max) = rectangle.bounds(corner);
    center.clamp(min, max).distance(center) < radius
}

fn overlaps_any_tile(layout: &TileLayout, shape: Shape, position: Vec2) -> bool {
    let (min, max) = shape.bounds(position);
    let tile_shape = Shape::Rectangle {
        width: layout.tile_width,
        height: layout.tile_width,
    };
    layout
        .colliding_tiles_between(layout.grid_coords(min), layout.grid_coords(max))
        .into_iter()
        .any(|coords| shapes_overlap(shape, position, tile_shape, layout.tile_origin(coords)))
}
