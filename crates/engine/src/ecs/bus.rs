use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use super::World;

/// Marker for values that can be published on an [`EventBus`].
pub trait Event: 'static {}

/// Handler for one event type. A system implements this once per event it
/// consumes and registers each in `System::subscribe`.
pub trait Receive<E: Event> {
    fn receive(&self, world: &mut World, event: &E);
}

pub(crate) type Handler = Rc<dyn Fn(&mut World, &dyn Any)>;

/// Synchronous typed dispatch table. Delivery happens through
/// `World::publish`, in subscription order.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<TypeId, Vec<Handler>>,
}

impl EventBus {
    pub fn subscribe<E: Event, R: Receive<E> + 'static>(&mut self, receiver: Rc<R>) {
        self.on::<E>(move |world, event| receiver.receive(world, event));
    }

    pub fn on<E: Event>(&mut self, handler: impl Fn(&mut World, &E) + 'static) {
        let erased: Handler = Rc::new(move |world: &mut World, event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(world, event);
            }
        });
        self.handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    pub(crate) fn handlers_for<E: Event>(&self) -> Vec<Handler> {
        self.handlers
            .get(&TypeId::of::<E>())
            .map(|handlers| handlers.iter().map(Rc::clone).collect())
            .unwrap_or_default()
    }
}
