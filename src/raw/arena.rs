use alloc::vec::Vec;

use super::node_id::NodeId;

/// Slot storage for tree nodes.
///
/// Vacated slots are recycled through a free list, so a `NodeId` stays valid
/// until its node is removed and is never shifted by other removals.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    vacant: Vec<NodeId>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            vacant: Vec::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Number of occupied slots.
    pub(crate) const fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    pub(crate) fn insert(&mut self, element: T) -> NodeId {
        if let Some(id) = self.vacant.pop() {
            self.slots[id.slot()] = Some(element);
            return id;
        }

        assert!(
            self.slots.len() <= NodeId::MAX_SLOT,
            "`Arena::insert()` - arena is full ({} slots)",
            NodeId::MAX_SLOT + 1
        );
        self.slots.push(Some(element));
        NodeId::from_slot(self.slots.len() - 1)
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &T {
        self.slots[id.slot()].as_ref().expect("`Arena::get()` - `id` is vacant!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut T {
        self.slots[id.slot()].as_mut().expect("`Arena::get_mut()` - `id` is vacant!")
    }

    /// Moves the element out and recycles its slot.
    pub(crate) fn remove(&mut self, id: NodeId) -> T {
        let element = self.slots[id.slot()].take().expect("`Arena::remove()` - `id` is vacant!");
        self.vacant.push(id);
        element
    }

    /// Drops every element but keeps the allocation.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    #[test]
    fn capacity_is_reserved_up_front() {
        let arena: Arena<u8> = Arena::with_capacity(10);
        assert!(arena.capacity() >= 10);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn vacated_slot_is_reused() {
        let mut arena = Arena::new();
        let a = arena.insert('a');
        let _b = arena.insert('b');
        assert_eq!(arena.remove(a), 'a');
        let c = arena.insert('c');
        assert_eq!(c, a);
        assert_eq!(*arena.get(c), 'c');
        assert_eq!(arena.len(), 2);
    }

    #[test]
    #[should_panic(expected = "`Arena::get()` - `id` is vacant!")]
    fn reading_a_vacated_slot_panics() {
        let mut arena = Arena::new();
        let a = arena.insert(1u8);
        arena.remove(a);
        let _ = arena.get(a);
    }

    proptest! {
        #[test]
        fn occupied_slots_keep_their_contents(operations in prop::collection::vec(strategy(), 0..256)) {
            let mut model: Vec<(NodeId, u32)> = Vec::new();
            let mut arena: Arena<u32> = Arena::new();

            for operation in operations {
                match operation {
                    Operation::Insert(value) => {
                        let id = arena.insert(value);
                        model.push((id, value));
                    }
                    Operation::Overwrite(which, value) => {
                        if model.is_empty() {
                            continue;
                        }
                        let index = which % model.len();
                        *arena.get_mut(model[index].0) = value;
                        model[index].1 = value;
                    }
                    Operation::Remove(which) => {
                        if model.is_empty() {
                            continue;
                        }
                        let index = which % model.len();
                        let (id, expected) = model.swap_remove(index);
                        prop_assert_eq!(arena.remove(id), expected);
                    }
                    Operation::Clear => {
                        arena.clear();
                        model.clear();
                    }
                }

                prop_assert_eq!(arena.len(), model.len());
                for &(id, value) in &model {
                    prop_assert_eq!(*arena.get(id), value);
                }
            }
        }
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Insert(u32),
        Overwrite(usize, u32),
        Remove(usize),
        Clear,
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            20 => any::<u32>().prop_map(Operation::Insert),
            5 => (any::<usize>(), any::<u32>()).prop_map(|(which, value)| Operation::Overwrite(which, value)),
            8 => any::<usize>().prop_map(Operation::Remove),
            1 => Just(Operation::Clear),
        ]
    }
}
