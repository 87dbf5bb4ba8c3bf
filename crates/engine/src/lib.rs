//! Deterministic fixed-step simulation core: an entity registry with typed
//! events, the gameplay systems built on it, and a headless loop runner.

pub mod app;
pub mod ecs;
pub mod math;
pub mod sim;

pub use app::{
    run_world, step_world, AppError, InputFeed, LoopConfig, LoopMetricsSnapshot, NoInput,
    RunMetrics, RunSummary, StopReason, TickKind,
};
pub use ecs::{Entity, EntityDestroyedEvent, Registry, RegistryError, System, World};
pub use math::{BoundedQuantity, Vec2, Vec2i};
