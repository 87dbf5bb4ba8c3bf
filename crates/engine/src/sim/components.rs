use std::collections::{BTreeSet, HashMap};

use crate::ecs::{Component, Entity, Registry};
use crate::math::{BoundedQuantity, Vec2, Vec2i};

use super::abilities::Ability;
use super::effects::Effect;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpatialData {
    pub position: Vec2,
    pub velocity: Vec2,
    pub z: f32,
    pub orientation: f32,
    pub time_moving: f32,
}

impl SpatialData {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn moving(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            orientation: velocity.angle(),
            ..Self::default()
        }
    }

    pub fn is_moving(&self) -> bool {
        !self.velocity.is_zero()
    }
}

impl Component for SpatialData {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Centered on the entity position.
    Circle { radius: f32 },
    /// Extends right and down from the entity position.
    Rectangle { width: f32, height: f32 },
}

impl Shape {
    /// Axis-aligned `(min, max)` corners of the shape placed at `position`.
    pub fn bounds(&self, position: Vec2) -> (Vec2, Vec2) {
        match *self {
            Shape::Circle { radius } => (
                position - Vec2::new(radius, radius),
                position + Vec2::new(radius, radius),
            ),
            Shape::Rectangle { width, height } => (position, position + Vec2::new(width, height)),
        }
    }
}

pub const UNLIMITED_COLLISIONS: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct Collidable {
    pub shape: Shape,
    pub collisions_until_destroyed: i32,
    pub time_until_collidable: f32,
    pub ignore_repeat_collisions: bool,
    pub collides_with_tiles: bool,
    pub ignored: BTreeSet<Entity>,
}

impl Collidable {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            collisions_until_destroyed: UNLIMITED_COLLISIONS,
            time_until_collidable: 0.0,
            ignore_repeat_collisions: false,
            collides_with_tiles: true,
            ignored: BTreeSet::new(),
        }
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(Shape::Circle { radius })
    }

    pub fn rectangle(width: f32, height: f32) -> Self {
        Self::new(Shape::Rectangle { width, height })
    }

    pub fn with_collisions_until_destroyed(mut self, collisions: i32) -> Self {
        self.collisions_until_destroyed = collisions;
        self
    }

    pub fn can_collide(&self, other: Entity) -> bool {
        self.time_until_collidable <= 0.0
            && self.collisions_until_destroyed != 0
            && !self.ignored.contains(&other)
    }

    pub fn add_ignored(&mut self, other: Entity) {
        self.ignored.insert(other);
    }

    /// Counts one collision; returns `true` when the budget has just run out.
    pub fn record_collision(&mut self) -> bool {
        self.collisions_until_destroyed = (self.collisions_until_destroyed - 1).max(-1);
        self.collisions_until_destroyed == 0
    }
}

impl Component for Collidable {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destructible {
    pub hp: BoundedQuantity,
    pub indestructible: bool,
    pub healable: bool,
}

impl Destructible {
    pub fn new(max_hp: f32) -> Self {
        Self {
            hp: BoundedQuantity::full(max_hp),
            indestructible: false,
            healable: true,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hp.is_at_min()
    }
}

impl Component for Destructible {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageType {
    Puncture,
    Slash,
    Impact,
    Heat,
    Cold,
    Electricity,
    Toxin,
}

impl DamageType {
    pub const fn vulnerability_stat(self) -> Stat {
        match self {
            DamageType::Puncture => Stat::PunctureVulnerability,
            DamageType::Slash => Stat::SlashVulnerability,
            DamageType::Impact => Stat::ImpactVulnerability,
            DamageType::Heat => Stat::HeatVulnerability,
            DamageType::Cold => Stat::ColdVulnerability,
            DamageType::Electricity => Stat::ElectricityVulnerability,
            DamageType::Toxin => Stat::ToxinVulnerability,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Damage {
    pub kind: DamageType,
    pub amount: f32,
}

impl Damage {
    pub const fn new(kind: DamageType, amount: f32) -> Self {
        Self { kind, amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Speed,
    Accel,
    SubjectiveTimeRate,
    Vulnerability,
    PunctureVulnerability,
    SlashVulnerability,
    ImpactVulnerability,
    HeatVulnerability,
    ColdVulnerability,
    ElectricityVulnerability,
    ToxinVulnerability,
}

const STAT_COUNT: usize = 11;

impl Stat {
    const fn index(self) -> usize {
        match self {
            Stat::Speed => 0,
            Stat::Accel => 1,
            Stat::SubjectiveTimeRate => 2,
            Stat::Vulnerability => 3,
            Stat::PunctureVulnerability => 4,
            Stat::SlashVulnerability => 5,
            Stat::ImpactVulnerability => 6,
            Stat::HeatVulnerability => 7,
            Stat::ColdVulnerability => 8,
            Stat::ElectricityVulnerability => 9,
            Stat::ToxinVulnerability => 10,
        }
    }
}

/// Base values plus the cached result of applying live conditions to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    base: [f32; STAT_COUNT],
    current: [f32; STAT_COUNT],
    pub dirty: bool,
}

impl Stats {
    pub fn new(speed: f32, accel: f32) -> Self {
        let mut base = [1.0; STAT_COUNT];
        base[Stat::Speed.index()] = speed;
        base[Stat::Accel.index()] = accel;
        Self {
            base,
            current: base,
            dirty: false,
        }
    }

    pub fn get(&self, stat: Stat) -> f32 {
        self.current[stat.index()]
    }

    pub fn base(&self, stat: Stat) -> f32 {
        self.base[stat.index()]
    }

    /// Overwrites the base value and the cached value; live conditions are
    /// reapplied on the next recalculation.
    pub fn set_base(&mut self, stat: Stat, value: f32) {
        self.base[stat.index()] = value;
        self.current[stat.index()] = value;
        self.dirty = true;
    }

    pub fn speed(&self) -> f32 {
        self.get(Stat::Speed)
    }

    pub fn accel(&self) -> f32 {
        self.get(Stat::Accel)
    }

    pub fn subjective_time_rate(&self) -> f32 {
        self.get(Stat::SubjectiveTimeRate)
    }

    /// Resets to base and applies every stat modifier, adders before
    /// multipliers. Sorts `conditions` by priority as a side effect.
    pub fn recalculate(&mut self, conditions: &mut Conditions) {
        self.current = self.base;
        conditions.sort_by_priority();
        for condition in conditions.iter() {
            match condition.kind {
                ConditionKind::StatAdd(stat) => self.current[stat.index()] += condition.strength,
                ConditionKind::StatMultiply(stat) => {
                    self.current[stat.index()] *= condition.strength
                }
                _ => {}
            }
        }
        self.dirty = false;
    }
}

impl Component for Stats {}

/// `dt` as experienced by `entity`: scaled by its subjective time rate when
/// it has stats.
pub fn subjective_dt(registry: &Registry, entity: Entity, dt: f32) -> f32 {
    registry
        .get::<Stats>(entity)
        .map_or(dt, |stats| dt * stats.subjective_time_rate())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Burn,
    Bleed,
    Poison,
    Regen,
    StatAdd(Stat),
    StatMultiply(Stat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConditionPriority {
    Adder,
    Multiplier,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub strength: f32,
    pub time_left: f32,
    pub ignore_subjective_time: bool,
}

impl Condition {
    pub fn new(kind: ConditionKind, strength: f32, time_left: f32) -> Self {
        Self {
            kind,
            strength,
            time_left,
            ignore_subjective_time: false,
        }
    }

    pub fn ignoring_subjective_time(mut self) -> Self {
        self.ignore_subjective_time = true;
        self
    }

    pub fn priority(&self) -> ConditionPriority {
        match self.kind {
            ConditionKind::StatAdd(_) => ConditionPriority::Adder,
            ConditionKind::StatMultiply(_) => ConditionPriority::Multiplier,
            _ => ConditionPriority::None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.time_left <= 0.0
    }

    /// Damage type dealt per tick by damage-over-time conditions.
    pub fn damage_type(&self) -> Option<DamageType> {
        match self.kind {
            ConditionKind::Burn => Some(DamageType::Heat),
            ConditionKind::Bleed => Some(DamageType::Slash),
            ConditionKind::Poison => Some(DamageType::Toxin),
            _ => None,
        }
    }

    pub fn is_beneficial(&self) -> bool {
        match self.kind {
            ConditionKind::Burn | ConditionKind::Bleed | ConditionKind::Poison => false,
            ConditionKind::Regen => true,
            ConditionKind::StatAdd(stat) => stat_gain_is_good(stat, self.strength > 0.0),
            ConditionKind::StatMultiply(stat) => stat_gain_is_good(stat, self.strength > 1.0),
        }
    }
}

fn stat_gain_is_good(stat: Stat, increases: bool) -> bool {
    match stat {
        Stat::Speed | Stat::Accel | Stat::SubjectiveTimeRate => increases,
        _ => !increases,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    active: Vec<Condition>,
}

impl Conditions {
    pub fn push(&mut self, condition: Condition) {
        self.active.push(condition);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.active.iter()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Condition> {
        self.active.get_mut(index)
    }

    /// Drops expired conditions; returns whether anything was removed.
    pub fn remove_expired(&mut self) -> bool {
        let before = self.active.len();
        self.active.retain(|condition| !condition.is_expired());
        self.active.len() != before
    }

    fn sort_by_priority(&mut self) {
        self.active.sort_by_key(Condition::priority);
    }
}

impl Component for Conditions {}

#[derive(Debug, Clone, Default)]
pub struct AbilityList {
    pub abilities: Vec<Ability>,
}

impl AbilityList {
    pub fn new(abilities: Vec<Ability>) -> Self {
        Self { abilities }
    }
}

impl Component for AbilityList {}

/// Effects applied to whatever this entity collides with.
#[derive(Debug, Clone, Default)]
pub struct OnCollision {
    /// Credited as the source of the effects; the colliding entity itself
    /// when unset.
    pub owner: Option<Entity>,
    pub effects: Vec<Effect>,
}

impl Component for OnCollision {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOut {
    pub time_left: f32,
}

impl TimeOut {
    pub fn new(time_left: f32) -> Self {
        Self { time_left }
    }

    pub fn is_expired(&self) -> bool {
        self.time_left <= 0.0
    }
}

impl Component for TimeOut {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tile {
    pub collides: bool,
}

/// Static world geometry on a square grid; kept once per world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileLayout {
    pub tile_width: f32,
    tiles: HashMap<Vec2i, Tile>,
}

impl TileLayout {
    pub fn new(tile_width: f32) -> Self {
        Self {
            tile_width,
            tiles: HashMap::new(),
        }
    }

    pub fn set(&mut self, coords: Vec2i, tile: Tile) {
        self.tiles.insert(coords, tile);
    }

    pub fn get(&self, coords: Vec2i) -> Option<&Tile> {
        self.tiles.get(&coords)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn grid_coords(&self, position: Vec2) -> Vec2i {
        position.floor_div(self.tile_width)
    }

    /// Upper-left corner of the tile at `coords`.
    pub fn tile_origin(&self, coords: Vec2i) -> Vec2 {
        Vec2::new(
            coords.x as f32 * self.tile_width,
            coords.y as f32 * self.tile_width,
        )
    }

    /// Colliding tiles whose coordinates fall in the inclusive range.
    pub fn colliding_tiles_between(&self, min: Vec2i, max: Vec2i) -> Vec<Vec2i> {
        let mut found = Vec::new();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                let coords = Vec2i::new(x, y);
                if self.get(coords).is_some_and(|tile| tile.collides) {
                    found.push(coords);
                }
            }
        }
        found
    }
}

impl Component for TileLayout {}

/// Steered by the input system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controllable;

impl Component for Controllable {}

/// The entity whose subjective time paces the outer loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraFocus;

impl Component for CameraFocus {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderableKind {
    Circle { radius: f32 },
    Line { length: f32 },
    Person,
    RectangularPrism { width: f32, height: f32, depth: f32 },
}

pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [255, 255, 255, 255];
pub const GREY: Rgba = [128, 128, 128, 255];
pub const ORANGE: Rgba = [255, 140, 0, 255];

/// Draw parameters for the external renderer; never read by the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub kind: RenderableKind,
    pub color: Rgba,
}

impl Renderable {
    pub fn new(kind: RenderableKind, color: Rgba) -> Self {
        Self { kind, color }
    }
}

impl Component for Renderable {}
