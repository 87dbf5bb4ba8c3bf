//! Gameplay layer: components, events, effects and the systems that tick
//! them.

pub mod abilities;
pub mod components;
pub mod effects;
pub mod events;
pub mod input;
pub mod systems;

pub use abilities::{Ability, AbilityCommand, AbilityKind};
pub use components::{
    subjective_dt, AbilityList, CameraFocus, Collidable, Condition, ConditionKind,
    ConditionPriority, Conditions, Controllable, Damage, DamageType, Destructible, OnCollision,
    Renderable, RenderableKind, Rgba, Shape, SpatialData, Stat, Stats, Tile, TileLayout, TimeOut,
    UNLIMITED_COLLISIONS,
};
pub use effects::Effect;
pub use events::{
    AbilityTrigger, CollidedEvent, ConditionEvent, ControlMoveAccelEvent, ControlUseAbilityEvent,
    DamagedEvent, HealedEvent, MovedEvent, WindowExitEvent,
};
pub use input::{InputAction, InputEvent};
