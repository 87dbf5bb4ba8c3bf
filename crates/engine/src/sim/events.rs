use crate::ecs::{Entity, Event};
use crate::math::Vec2;

use super::components::{Condition, Damage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovedEvent {
    pub entity: Entity,
    pub old_position: Vec2,
    pub new_position: Vec2,
}

impl Event for MovedEvent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollidedEvent {
    pub one: Entity,
    pub two: Entity,
}

impl Event for CollidedEvent {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamagedEvent {
    pub source: Entity,
    pub target: Entity,
    pub damage: Damage,
}

impl Event for DamagedEvent {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealedEvent {
    pub source: Entity,
    pub target: Entity,
    pub amount: f32,
}

impl Event for HealedEvent {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionEvent {
    pub condition: Condition,
    pub source: Entity,
    pub receiver: Entity,
}

impl Event for ConditionEvent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowExitEvent;

impl Event for WindowExitEvent {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlMoveAccelEvent {
    pub entity: Entity,
    pub accel: Vec2,
}

impl Event for ControlMoveAccelEvent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityTrigger {
    KeyDown,
    KeyUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlUseAbilityEvent {
    pub entity: Entity,
    pub trigger: AbilityTrigger,
    pub target: Vec2,
    pub ability: usize,
}

impl Event for ControlUseAbilityEvent {}
