//! Child-list mutation observers.
//!
//! Records are queued synchronously while the tree changes and delivered in batches
//! through `take_mutation_records`. Subtree registrations follow parent links only, so a
//! registration on a document never sees changes inside shadow trees; those need their
//! own registration on the shadow root.
use crate::document::Document;
use crate::error::DomError;
use crate::types::{NodeKey, ObserverId};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub subtree: bool,
}

impl MutationObserverInit {
    pub const CHILD_LIST_SUBTREE: Self = Self {
        child_list: true,
        subtree: true,
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeKey,
    pub added_nodes: Vec<NodeKey>,
    pub removed_nodes: Vec<NodeKey>,
}

#[derive(Default)]
struct ObserverState {
    registrations: Vec<(NodeKey, MutationObserverInit)>,
    queue: Vec<MutationRecord>,
}

impl ObserverState {
    fn interested_in(&self, target: NodeKey, ancestors: &[NodeKey]) -> bool {
        self.registrations.iter().any(|(observed, init)| {
            init.child_list
                && (*observed == target || (init.subtree && ancestors.contains(observed)))
        })
    }
}

#[derive(Default)]
pub(crate) struct MutationObservers {
    observers: BTreeMap<ObserverId, ObserverState>,
}

impl Document {
    pub fn create_mutation_observer(&mut self) -> ObserverId {
        let id = self.next_observer_id();
        self.mutations.observers.insert(id, ObserverState::default());
        id
    }

    /// Registers `target`. Observing the same target again replaces its options.
    pub fn observe_mutations(
        &mut self,
        observer: ObserverId,
        target: NodeKey,
        init: MutationObserverInit,
    ) -> Result<(), DomError> {
        self.node(target)?;
        let state = self
            .mutations
            .observers
            .get_mut(&observer)
            .ok_or(DomError::UnknownObserver(observer))?;
        match state.registrations.iter_mut().find(|(t, _)| *t == target) {
            Some((_, existing)) => *existing = init,
            None => state.registrations.push((target, init)),
        }
        Ok(())
    }

    /// Drains queued records in the order they were produced.
    pub fn take_mutation_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.mutations
            .observers
            .get_mut(&observer)
            .map(|state| std::mem::take(&mut state.queue))
            .unwrap_or_default()
    }

    pub fn has_pending_mutation_records(&self) -> bool {
        self.mutations.observers.values().any(|s| !s.queue.is_empty())
    }

    /// Drops the observer, its registrations and any undelivered records.
    pub fn disconnect_mutation_observer(&mut self, observer: ObserverId) {
        self.mutations.observers.remove(&observer);
    }

    pub fn mutation_observer_count(&self) -> usize {
        self.mutations.observers.len()
    }

    pub(crate) fn queue_child_list(
        &mut self,
        target: NodeKey,
        added_nodes: Vec<NodeKey>,
        removed_nodes: Vec<NodeKey>,
    ) {
        if self.mutations.observers.is_empty() {
            return;
        }
        let mut ancestors = Vec::new();
        let mut current = self.parent(target);
        while let Some(key) = current {
            ancestors.push(key);
            current = self.parent(key);
        }

        let record = MutationRecord {
            target,
            added_nodes,
            removed_nodes,
        };
        for state in self.mutations.observers.values_mut() {
            if state.interested_in(target, &ancestors) {
                state.queue.push(record.clone());
            }
        }
    }
}
