mod ability;
mod collision;
mod collision_handler;
mod condition;
mod control;
mod destructible;
mod input;
mod movement;
mod snapshot;
mod timeout;

pub use ability::AbilitySystem;
pub use collision::{
    shapes_overlap, CollisionSystem, DEFAULT_GRID_WIDTH, MAX_TILE_RESOLUTION_STEPS,
    TILE_STEP_FRACTION,
};
pub use collision_handler::CollisionHandlerSystem;
pub use condition::ConditionSystem;
pub use control::{ControlSystem, STOP_SPEED};
pub use destructible::DestructibleSystem;
pub use input::InputSystem;
pub use movement::MovementSystem;
pub use snapshot::{FocusSummary, SnapshotLogSystem, WorldSummary, DEFAULT_SNAPSHOT_INTERVAL};
pub use timeout::TimeOutSystem;
