use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use super::{Entity, Event, EventBus, Registry};

/// Published by [`World::destroy`] while the entity and its components are
/// still readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDestroyedEvent {
    pub entity: Entity,
}

impl Event for EntityDestroyedEvent {}

/// A stage of the per-tick pipeline. State that changes over time lives in
/// interior-mutable fields; borrows of it must not be held across
/// `World::publish` or `World::destroy`.
pub trait System: 'static {
    fn name(&self) -> &'static str;

    fn init(&self, _world: &mut World) {}

    fn subscribe(self: Rc<Self>, _bus: &mut EventBus) {}

    fn update(&self, world: &mut World, dt: f32);
}

#[derive(Default)]
pub struct World {
    registry: Registry,
    bus: EventBus,
    systems: Vec<Rc<dyn System>>,
    display_systems: Vec<Rc<dyn System>>,
    dying: HashSet<Entity>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn add_system<S: System>(&mut self, system: S) -> Rc<S> {
        let system = self.bind(system);
        self.systems.push(Rc::clone(&system) as Rc<dyn System>);
        system
    }

    /// Display systems run after every simulation system and are skipped by
    /// [`World::update_simulation`].
    pub fn add_display_system<S: System>(&mut self, system: S) -> Rc<S> {
        let system = self.bind(system);
        self.display_systems
            .push(Rc::clone(&system) as Rc<dyn System>);
        system
    }

    fn bind<S: System>(&mut self, system: S) -> Rc<S> {
        let system = Rc::new(system);
        system.init(self);
        Rc::clone(&system).subscribe(&mut self.bus);
        debug!(system = system.name(), "system_registered");
        system
    }

    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems
            .iter()
            .chain(self.display_systems.iter())
            .map(|system| system.name())
            .collect()
    }

    pub fn update_all(&mut self, dt: f32) {
        self.update_simulation(dt);
        for index in 0..self.display_systems.len() {
            let system = Rc::clone(&self.display_systems[index]);
            system.update(self, dt);
        }
    }

    pub fn update_simulation(&mut self, dt: f32) {
        for index in 0..self.systems.len() {
            let system = Rc::clone(&self.systems[index]);
            system.update(self, dt);
        }
    }

    /// Delivers `event` to every subscriber before returning. Handlers may
    /// publish further events; those run depth-first.
    pub fn publish<E: Event>(&mut self, event: E) {
        for handler in self.bus.handlers_for::<E>() {
            handler(self, &event);
        }
    }

    /// Announces the destruction, then removes the entity. Returns `false`
    /// for stale handles and for entities already being destroyed.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.registry.contains(entity) || !self.dying.insert(entity) {
            return false;
        }
        self.publish(EntityDestroyedEvent { entity });
        self.dying.remove(&entity);
        self.registry.destroy(entity)
    }

    pub fn destroy_all(&mut self, entities: impl IntoIterator<Item = Entity>) -> usize {
        entities
            .into_iter()
            .filter(|entity| self.destroy(*entity))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::ecs::{Component, Receive};

    struct Tag;
    impl Component for Tag {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Ping(u32);
    impl Event for Ping {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pong(u32);
    impl Event for Pong {}

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<String>>,
        updates: Cell<u32>,
    }

    impl System for Recorder {
        fn name(&self) -> &'static str {
            "Recorder"
        }

        fn subscribe(self: Rc<Self>, bus: &mut EventBus) {
            bus.subscribe::<Ping, _>(Rc::clone(&self));
            bus.subscribe::<Pong, _>(self);
        }

        fn update(&self, _world: &mut World, _dt: f32) {
            self.updates.set(self.updates.get() + 1);
        }
    }

    impl Receive<Ping> for Recorder {
        fn receive(&self, world: &mut World, event: &Ping) {
            self.log.borrow_mut().push(format!("ping {}", event.0));
            if event.0 > 0 {
                world.publish(Pong(event.0));
            }
            self.log.borrow_mut().push(format!("ping {} done", event.0));
        }
    }

    impl Receive<Pong> for Recorder {
        fn receive(&self, _world: &mut World, event: &Pong) {
            self.log.borrow_mut().push(format!("pong {}", event.0));
        }
    }

    #[test]
    fn reentrant_publish_runs_depth_first() {
        let mut world = World::new();
        let recorder = world.add_system(Recorder::default());

        world.publish(Ping(1));

        assert_eq!(
            *recorder.log.borrow(),
            vec!["ping 1", "pong 1", "ping 1 done"]
        );
    }

    #[test]
    fn add_system_registers_its_subscriptions() {
        let mut world = World::new();
        assert_eq!(world.bus_mut().subscriber_count::<Ping>(), 0);

        world.add_system(Recorder::default());
        world.add_system(Recorder::default());

        assert_eq!(world.bus_mut().subscriber_count::<Ping>(), 2);
        assert_eq!(world.bus_mut().subscriber_count::<Pong>(), 2);
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let mut world = World::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            world
                .bus_mut()
                .on::<Ping>(move |_, _| order.borrow_mut().push(label));
        }

        world.publish(Ping(0));

        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn destroy_announces_before_removal() {
        let mut world = World::new();
        let entity = world.registry_mut().create();
        world.registry_mut().attach(entity, Tag).expect("attach");

        let saw_component = Rc::new(Cell::new(false));
        let flag = Rc::clone(&saw_component);
        world
            .bus_mut()
            .on::<EntityDestroyedEvent>(move |world, event| {
                flag.set(world.registry().has::<Tag>(event.entity));
            });

        assert!(world.destroy(entity));
        assert!(saw_component.get());
        assert!(!world.registry().contains(entity));
        assert!(!world.destroy(entity));
    }

    #[test]
    fn nested_destroy_of_same_entity_is_ignored() {
        let mut world = World::new();
        let entity = world.registry_mut().create();
        let notifications = Rc::new(Cell::new(0));
        let counter = Rc::clone(&notifications);
        world
            .bus_mut()
            .on::<EntityDestroyedEvent>(move |world, event| {
                counter.set(counter.get() + 1);
                assert!(!world.destroy(event.entity));
            });

        assert!(world.destroy(entity));
        assert_eq!(notifications.get(), 1);
    }

    #[test]
    fn display_systems_skip_simulation_only_updates() {
        let mut world = World::new();
        let simulation = world.add_system(Recorder::default());
        let display = world.add_display_system(Recorder::default());

        world.update_all(0.1);
        world.update_simulation(0.1);

        assert_eq!(simulation.updates.get(), 2);
        assert_eq!(display.updates.get(), 1);
        assert_eq!(world.system_names(), vec!["Recorder", "Recorder"]);
    }
}
