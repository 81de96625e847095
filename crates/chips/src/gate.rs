use dom::{Document, DomError, NodeKey, ObserverId, RootMargin};
use log::trace;
use std::collections::BTreeMap;

struct Gate<J> {
    element: NodeKey,
    job: J,
}

/// One intersection observer per gated element. A gate fires on the first entry that
/// reports its element intersecting, then detaches for good. Gates whose element never
/// gets near the viewport stay attached.
pub struct GateSet<J> {
    gates: BTreeMap<ObserverId, Gate<J>>,
}

impl<J> Default for GateSet<J> {
    fn default() -> Self {
        Self {
            gates: BTreeMap::new(),
        }
    }
}

impl<J> GateSet<J> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(
        &mut self,
        doc: &mut Document,
        element: NodeKey,
        margin: RootMargin,
        job: J,
    ) -> Result<ObserverId, DomError> {
        let observer = doc.create_intersection_observer(margin);
        if let Err(e) = doc.observe_intersection(observer, element) {
            doc.disconnect_intersection_observer(observer);
            return Err(e);
        }
        self.gates.insert(observer, Gate { element, job });
        Ok(observer)
    }

    /// Jobs whose element has intersected since the last call, in gate creation order.
    /// Their observers are unobserved and disconnected before this returns.
    pub fn take_triggered(&mut self, doc: &mut Document) -> Vec<J> {
        let mut fired = Vec::new();
        for (&observer, gate) in &self.gates {
            let entries = doc.take_intersection_entries(observer);
            if entries.iter().any(|e| e.target == gate.element && e.is_intersecting) {
                fired.push(observer);
            }
        }

        let mut jobs = Vec::with_capacity(fired.len());
        for observer in fired {
            if let Some(gate) = self.gates.remove(&observer) {
                doc.unobserve_intersection(observer, gate.element);
                doc.disconnect_intersection_observer(observer);
                trace!("gate {} fired for element {}", observer.0, gate.element.0);
                jobs.push(gate.job);
            }
        }
        jobs
    }

    pub fn is_gated(&self, element: NodeKey) -> bool {
        self.gates.values().any(|g| g.element == element)
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn disconnect_all(&mut self, doc: &mut Document) {
        for observer in std::mem::take(&mut self.gates).into_keys() {
            doc.disconnect_intersection_observer(observer);
        }
    }
}
