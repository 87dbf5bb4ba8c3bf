use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::ecs::{Entity, EventBus, Receive, System, World};
use crate::math::Vec2;
use crate::sim::components::{Controllable, SpatialData};
use crate::sim::events::{
    AbilityTrigger, ControlMoveAccelEvent, ControlUseAbilityEvent, WindowExitEvent,
};
use crate::sim::input::{ActionStates, InputAction, InputEvent};

/// Turns raw platform input into control events for every controllable
/// entity. Held movement keys are sampled once per tick.
#[derive(Debug, Default)]
pub struct InputSystem {
    actions: RefCell<ActionStates>,
    cursor: Cell<Vec2>,
}

impl InputSystem {
    pub fn cursor(&self) -> Vec2 {
        self.cursor.get()
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.borrow().is_down(action)
    }

    fn publish_ability(world: &mut World, slot: usize, trigger: AbilityTrigger, target: Vec2) {
        for entity in world.registry().entities_with::<&Controllable>() {
            world.publish(ControlUseAbilityEvent {
                entity,
                trigger,
                target,
                ability: slot,
            });
        }
    }

    fn controlled(world: &World) -> Vec<Entity> {
        world
            .registry()
            .entities_with::<(&SpatialData, &Controllable)>()
    }
}

impl System for InputSystem {
    fn name(&self) -> &'static str {
        "Input"
    }

    fn subscribe(self: Rc<Self>, bus: &mut EventBus) {
        bus.subscribe::<InputEvent, _>(self);
    }

    fn update(&self, world: &mut World, _dt: f32) {
        let accel = self.actions.borrow().move_direction();
        for entity in Self::controlled(world) {
            world.publish(ControlMoveAccelEvent { entity, accel });
        }
    }
}

impl Receive<InputEvent> for InputSystem {
    fn receive(&self, world: &mut World, event: &InputEvent) {
        match *event {
            InputEvent::CursorMoved(position) => self.cursor.set(position),
            InputEvent::Quit | InputEvent::Pressed(InputAction::Quit) => {
                world.publish(WindowExitEvent);
            }
            InputEvent::Pressed(action) => {
                let was_down = self.actions.borrow().is_down(action);
                self.actions.borrow_mut().set(action, true);
                if let (Some(slot), false) = (action.ability_slot(), was_down) {
                    Self::publish_ability(world, slot, AbilityTrigger::KeyDown, self.cursor());
                }
            }
            InputEvent::Released(action) => {
                self.actions.borrow_mut().set(action, false);
                if let Some(slot) = action.ability_slot() {
                    Self::publish_ability(world, slot, AbilityTrigger::KeyUp, self.cursor());
                }
            }
        }
    }
}
