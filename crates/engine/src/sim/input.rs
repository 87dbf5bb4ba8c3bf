use serde::{Deserialize, Serialize};

use crate::ecs::Event;
use crate::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Ability1,
    Ability2,
    Ability3,
    Ability4,
    Quit,
}

const ACTION_COUNT: usize = 9;

impl InputAction {
    pub const ABILITIES: [InputAction; 4] = [
        InputAction::Ability1,
        InputAction::Ability2,
        InputAction::Ability3,
        InputAction::Ability4,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Ability1 => 4,
            InputAction::Ability2 => 5,
            InputAction::Ability3 => 6,
            InputAction::Ability4 => 7,
            InputAction::Quit => 8,
        }
    }

    pub const fn ability_slot(self) -> Option<usize> {
        match self {
            InputAction::Ability1 => Some(0),
            InputAction::Ability2 => Some(1),
            InputAction::Ability3 => Some(2),
            InputAction::Ability4 => Some(3),
            _ => None,
        }
    }
}

/// Raw device input, already translated to actions and world coordinates by
/// the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEvent {
    Pressed(InputAction),
    Released(InputAction),
    CursorMoved(Vec2),
    Quit,
}

impl Event for InputEvent {}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    /// Isometric acceleration direction from the held movement keys; each
    /// arrow moves along a screen diagonal of the world grid.
    pub(crate) fn move_direction(&self) -> Vec2 {
        let mut accel = Vec2::ZERO;
        if self.is_down(InputAction::MoveLeft) {
            accel += Vec2::new(-1.0, 1.0);
        }
        if self.is_down(InputAction::MoveRight) {
            accel += Vec2::new(1.0, -1.0);
        }
        if self.is_down(InputAction::MoveUp) {
            accel += Vec2::new(-1.0, -1.0);
        }
        if self.is_down(InputAction::MoveDown) {
            accel += Vec2::new(1.0, 1.0);
        }
        accel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_keys_cancel() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveLeft, true);
        states.set(InputAction::MoveRight, true);
        assert_eq!(states.move_direction(), Vec2::ZERO);
    }

    #[test]
    fn up_moves_toward_negative_diagonal() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveUp, true);
        assert_eq!(states.move_direction(), Vec2::new(-1.0, -1.0));
        states.set(InputAction::MoveUp, false);
        assert!(!states.is_down(InputAction::MoveUp));
    }

    #[test]
    fn ability_slots_follow_action_order() {
        let slots: Vec<_> = InputAction::ABILITIES
            .iter()
            .filter_map(|action| action.ability_slot())
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
        assert_eq!(InputAction::Quit.ability_slot(), None);
    }

    #[test]
    fn input_events_read_from_snake_case_json() {
        let events: Vec<InputEvent> = serde_json::from_str(
            r#"[{"pressed": "ability1"}, {"cursor_moved": {"x": 4.0, "y": -2.0}}, "quit"]"#,
        )
        .expect("events");
        assert_eq!(
            events,
            vec![
                InputEvent::Pressed(InputAction::Ability1),
                InputEvent::CursorMoved(Vec2::new(4.0, -2.0)),
                InputEvent::Quit,
            ]
        );
    }
}
