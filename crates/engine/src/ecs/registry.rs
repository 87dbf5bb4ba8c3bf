use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use thiserror::Error;

use super::entity::{Entity, EntityAllocator};

/// Marker for types that can be stored per entity in a [`Registry`].
pub trait Component: 'static {}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity {entity} is not alive")]
    StaleEntity { entity: Entity },
    #[error("component {component} is already attached to entity {entity}")]
    AlreadyAttached {
        entity: Entity,
        component: &'static str,
    },
}

trait ComponentStore {
    fn remove_slot(&mut self, slot: usize);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Storage<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: Component> ComponentStore for Storage<T> {
    fn remove_slot(&mut self, slot: usize) {
        if let Some(value) = self.slots.get_mut(slot) {
            *value = None;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A read-only component query: a single `&T` or a tuple of them.
pub trait Query {
    type Item<'r>;

    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Item<'_>>;
}

impl<A: Component> Query for &A {
    type Item<'r> = &'r A;

    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Item<'_>> {
        registry.get::<A>(entity)
    }
}

impl<A: Component, B: Component> Query for (&A, &B) {
    type Item<'r> = (&'r A, &'r B);

    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Item<'_>> {
        Some((registry.get::<A>(entity)?, registry.get::<B>(entity)?))
    }
}

impl<A: Component, B: Component, C: Component> Query for (&A, &B, &C) {
    type Item<'r> = (&'r A, &'r B, &'r C);

    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Item<'_>> {
        Some((
            registry.get::<A>(entity)?,
            registry.get::<B>(entity)?,
            registry.get::<C>(entity)?,
        ))
    }
}

/// Entity store with one type-erased storage per component type.
///
/// Destroying entities here skips destruction notification; simulation code
/// goes through `World::destroy` instead.
#[derive(Default)]
pub struct Registry {
    entities: EntityAllocator,
    stores: HashMap<TypeId, Box<dyn ComponentStore>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> Entity {
        self.entities.allocate()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    pub fn attach<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<&mut T, RegistryError> {
        if !self.contains(entity) {
            return Err(RegistryError::StaleEntity { entity });
        }
        if self.has::<T>(entity) {
            return Err(RegistryError::AlreadyAttached {
                entity,
                component: type_name::<T>(),
            });
        }

        let slot = entity.index() as usize;
        let storage = self.storage_or_insert::<T>();
        if storage.slots.len() <= slot {
            storage.slots.resize_with(slot + 1, || None);
        }
        Ok(storage.slots[slot].insert(value))
    }

    pub fn detach<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.contains(entity) {
            return None;
        }
        self.storage_mut::<T>()?
            .slots
            .get_mut(entity.index() as usize)?
            .take()
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.contains(entity) {
            return None;
        }
        self.storage::<T>()?
            .slots
            .get(entity.index() as usize)?
            .as_ref()
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.contains(entity) {
            return None;
        }
        self.storage_mut::<T>()?
            .slots
            .get_mut(entity.index() as usize)?
            .as_mut()
    }

    /// # Panics
    ///
    /// Panics if `entity` does not own a `T`.
    pub fn component<T: Component>(&self, entity: Entity) -> &T {
        self.get::<T>(entity).unwrap_or_else(|| {
            panic!(
                "entity {entity} has no {} component; check `has` first when it is optional",
                type_name::<T>()
            )
        })
    }

    /// # Panics
    ///
    /// Panics if `entity` does not own a `T`.
    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        self.get_mut::<T>(entity).unwrap_or_else(|| {
            panic!(
                "entity {entity} has no {} component; check `has` first when it is optional",
                type_name::<T>()
            )
        })
    }

    /// Removes every component of `entity` and retires its handle.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.free(entity) {
            return false;
        }
        let slot = entity.index() as usize;
        for store in self.stores.values_mut() {
            store.remove_slot(slot);
        }
        true
    }

    /// Lazy pass over every live entity owning the full component set.
    pub fn view<Q: Query>(&self) -> impl Iterator<Item = (Entity, Q::Item<'_>)> + '_ {
        self.entities
            .iter()
            .filter_map(move |entity| Q::fetch(self, entity).map(|item| (entity, item)))
    }

    /// Snapshot of the entities matching `Q`, for passes that mutate or
    /// destroy while walking.
    pub fn entities_with<Q: Query>(&self) -> Vec<Entity> {
        self.view::<Q>().map(|(entity, _)| entity).collect()
    }

    /// First live owner of a `T`, for components kept once per world.
    pub fn singleton<T: Component>(&self) -> Option<(Entity, &T)> {
        self.view::<&T>().next()
    }

    fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        self.stores
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<Storage<T>>()
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut Storage<T>> {
        self.stores
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<Storage<T>>()
    }

    fn storage_or_insert<T: Component>(&mut self) -> &mut Storage<T> {
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Storage::<T>::default()))
            .as_any_mut()
            .downcast_mut::<Storage<T>>()
            .expect("component storage is keyed by its own TypeId")
    }
}
