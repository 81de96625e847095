//! Mutation monitors, one per scope.
//!
//! A scope is the document or a shadow root. Each gets a single child-list + subtree
//! observer, so insertions anywhere below it are reported without per-element
//! observers. Observation does not cross into shadow trees; every shadow root that
//! matters gets a monitor of its own, keyed by the root's identity.
use dom::{Document, DomError, MutationObserverInit, NodeKey, ObserverId};
use log::debug;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope {
    pub root: NodeKey,
    pub container: NodeKey,
    pub observer: ObserverId,
}

/// An element reported by a monitor, with the container its scope feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Discovered {
    pub element: NodeKey,
    pub container: NodeKey,
}

#[derive(Default)]
pub struct MonitorTree {
    scopes: BTreeMap<NodeKey, Scope>,
}

impl MonitorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start monitoring `root`. Returns `None` when it is already monitored.
    pub fn attach(
        &mut self,
        doc: &mut Document,
        root: NodeKey,
        container: NodeKey,
    ) -> Result<Option<Scope>, DomError> {
        if self.scopes.contains_key(&root) {
            return Ok(None);
        }
        let observer = doc.create_mutation_observer();
        doc.observe_mutations(observer, root, MutationObserverInit::CHILD_LIST_SUBTREE)?;
        let scope = Scope {
            root,
            container,
            observer,
        };
        self.scopes.insert(root, scope);
        debug!("monitoring scope {} (container {})", root.0, container.0);
        Ok(Some(scope))
    }

    /// Existing elements of `scope`, for the sweep that follows `attach`.
    pub fn sweep(&self, doc: &Document, scope: &Scope) -> Vec<Discovered> {
        elements_in(doc, doc.descendants(scope.root), scope.container)
    }

    /// Drains every scope's records. Each added element is reported together with its
    /// light-DOM descendants, in tree order; text and comments are dropped.
    pub fn take_discovered(&mut self, doc: &mut Document) -> Vec<Discovered> {
        let mut out = Vec::new();
        for scope in self.scopes.values() {
            for record in doc.take_mutation_records(scope.observer) {
                for added in record.added_nodes {
                    let mut subtree = vec![added];
                    subtree.extend(doc.descendants(added));
                    out.extend(elements_in(doc, subtree, scope.container));
                }
            }
        }
        out
    }

    pub fn is_monitoring(&self, root: NodeKey) -> bool {
        self.scopes.contains_key(&root)
    }

    pub fn scope(&self, root: NodeKey) -> Option<&Scope> {
        self.scopes.get(&root)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn disconnect_all(&mut self, doc: &mut Document) {
        for scope in std::mem::take(&mut self.scopes).into_values() {
            doc.disconnect_mutation_observer(scope.observer);
        }
    }
}

fn elements_in(doc: &Document, nodes: Vec<NodeKey>, container: NodeKey) -> Vec<Discovered> {
    nodes
        .into_iter()
        .filter(|k| doc.is_element(*k))
        .map(|element| Discovered { element, container })
        .collect()
}
