use std::collections::BTreeSet;

use super::Entity;

/// Victims collected during a traversal and destroyed after it, in handle
/// order, each at most once.
#[derive(Debug, Default, Clone)]
pub struct DestroyQueue {
    pending: BTreeSet<Entity>,
}

impl DestroyQueue {
    pub fn schedule(&mut self, entity: Entity) -> bool {
        self.pending.insert(entity)
    }

    pub fn is_scheduled(&self, entity: Entity) -> bool {
        self.pending.contains(&entity)
    }

    pub fn cancel(&mut self, entity: Entity) -> bool {
        self.pending.remove(&entity)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Registry;

    #[test]
    fn schedule_deduplicates_and_drain_empties() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();

        let mut queue = DestroyQueue::default();
        assert!(queue.schedule(b));
        assert!(queue.schedule(a));
        assert!(!queue.schedule(b));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain(), vec![a, b]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_removes_a_scheduled_entity() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();

        let mut queue = DestroyQueue::default();
        queue.schedule(a);
        queue.schedule(b);
        assert!(queue.is_scheduled(a));

        assert!(queue.cancel(a));
        assert!(!queue.cancel(a));
        assert!(!queue.is_scheduled(a));
        assert!(queue.is_scheduled(b));
        assert_eq!(queue.drain(), vec![b]);
    }
}
