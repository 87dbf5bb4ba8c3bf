use engine::math::Vec2;
use engine::sim::{InputAction, InputEvent};
use engine::InputFeed;
use tracing::debug;

use super::config::ScriptStep;

/// Replays a fixed list of input events, each on its scheduled tick.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedInput {
    steps: Vec<ScriptStep>,
    next: usize,
}

impl ScriptedInput {
    pub(crate) fn new(mut steps: Vec<ScriptStep>) -> Self {
        // Stable, so same-tick events keep their listed order.
        steps.sort_by_key(|step| step.tick);
        Self { steps, next: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.steps.len() - self.next
    }
}

impl InputFeed for ScriptedInput {
    fn events_for_tick(&mut self, tick: u64) -> Vec<InputEvent> {
        let mut events = Vec::new();
        while let Some(step) = self.steps.get(self.next) {
            if step.tick > tick {
                break;
            }
            events.push(step.event);
            self.next += 1;
        }
        if !events.is_empty() {
            debug!(tick, count = events.len(), "scripted_input");
        }
        events
    }
}

fn step(tick: u64, event: InputEvent) -> ScriptStep {
    ScriptStep { tick, event }
}

/// A short headless skirmish: shoot the nearest dummy, walk toward the
/// grid, then throw and steer a puck.
pub(crate) fn demo_script() -> Vec<ScriptStep> {
    use InputAction::{Ability1, Ability2, MoveDown, MoveRight};
    use InputEvent::{CursorMoved, Pressed, Released};

    vec![
        step(0, CursorMoved(Vec2::new(100.0, 100.0))),
        step(1, Pressed(Ability1)),
        step(2, Released(Ability1)),
        step(30, Pressed(MoveDown)),
        step(90, Released(MoveDown)),
        step(100, Pressed(MoveRight)),
        step(130, Released(MoveRight)),
        step(180, CursorMoved(Vec2::new(400.0, 400.0))),
        step(181, Pressed(Ability2)),
        step(230, CursorMoved(Vec2::new(0.0, 500.0))),
        step(231, Released(Ability2)),
        step(300, Pressed(Ability1)),
        step(301, Released(Ability1)),
    ]
}
