mod bus;
mod deferred;
mod entity;
mod registry;
mod world;

pub use bus::{Event, EventBus, Receive};
pub use deferred::DestroyQueue;
pub use entity::Entity;
pub use registry::{Component, Query, Registry, RegistryError};
pub use world::{EntityDestroyedEvent, System, World};
