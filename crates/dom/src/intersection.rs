//! Intersection observers over host-supplied geometry.
//!
//! Layout is owned by the host: it reports the viewport and per-element boxes, then calls
//! `update_intersections` once per frame. Each observer queues an entry for a target when
//! the target's intersecting state changes; the first evaluation after `observe` always
//! reports.
use crate::document::Document;
use crate::error::DomError;
use crate::types::{NodeKey, ObserverId, Rect};
use std::collections::{BTreeMap, HashMap};

/// Grows the viewport before testing intersection, so targets can be reported
/// slightly before they are on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RootMargin {
    Pixels(f32),
    /// Percent of the viewport width (horizontal edges) and height (vertical edges).
    Percent(f32),
}

impl RootMargin {
    /// Parses `10%`, `200px` or a bare `0`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(num) = value.strip_suffix('%') {
            return num.trim().parse().ok().map(RootMargin::Percent);
        }
        if let Some(num) = value.strip_suffix("px") {
            return num.trim().parse().ok().map(RootMargin::Pixels);
        }
        match value.parse::<f32>() {
            Ok(n) if n == 0.0 => Some(RootMargin::Pixels(0.0)),
            _ => None,
        }
    }

    pub fn apply(&self, viewport: Rect) -> Rect {
        match *self {
            RootMargin::Pixels(px) => viewport.inflate(px, px),
            RootMargin::Percent(pct) => viewport.inflate(
                viewport.width * pct / 100.0,
                viewport.height * pct / 100.0,
            ),
        }
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        RootMargin::Pixels(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntersectionEntry {
    pub target: NodeKey,
    pub is_intersecting: bool,
}

struct Target {
    node: NodeKey,
    last: Option<bool>,
}

struct ObserverState {
    margin: RootMargin,
    targets: Vec<Target>,
    queue: Vec<IntersectionEntry>,
}

pub(crate) struct IntersectionObservers {
    observers: BTreeMap<ObserverId, ObserverState>,
    boxes: HashMap<NodeKey, Rect>,
    viewport: Rect,
}

impl Default for IntersectionObservers {
    fn default() -> Self {
        Self {
            observers: BTreeMap::new(),
            boxes: HashMap::new(),
            viewport: Rect::new(0.0, 0.0, 800.0, 600.0),
        }
    }
}

impl Document {
    pub fn viewport(&self) -> Rect {
        self.intersections.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.intersections.viewport = viewport;
    }

    /// `None` means the element generates no box and never intersects.
    pub fn set_layout_box(&mut self, key: NodeKey, rect: Option<Rect>) {
        match rect {
            Some(rect) => self.intersections.boxes.insert(key, rect),
            None => self.intersections.boxes.remove(&key),
        };
    }

    pub fn layout_box(&self, key: NodeKey) -> Option<Rect> {
        self.intersections.boxes.get(&key).copied()
    }

    pub fn create_intersection_observer(&mut self, margin: RootMargin) -> ObserverId {
        let id = self.next_observer_id();
        self.intersections.observers.insert(
            id,
            ObserverState {
                margin,
                targets: Vec::new(),
                queue: Vec::new(),
            },
        );
        id
    }

    pub fn observe_intersection(
        &mut self,
        observer: ObserverId,
        target: NodeKey,
    ) -> Result<(), DomError> {
        self.node(target)?;
        let state = self
            .intersections
            .observers
            .get_mut(&observer)
            .ok_or(DomError::UnknownObserver(observer))?;
        if !state.targets.iter().any(|t| t.node == target) {
            state.targets.push(Target {
                node: target,
                last: None,
            });
        }
        Ok(())
    }

    /// Stops watching `target` and drops its undelivered entries.
    pub fn unobserve_intersection(&mut self, observer: ObserverId, target: NodeKey) {
        if let Some(state) = self.intersections.observers.get_mut(&observer) {
            state.targets.retain(|t| t.node != target);
            state.queue.retain(|e| e.target != target);
        }
    }

    pub fn disconnect_intersection_observer(&mut self, observer: ObserverId) {
        self.intersections.observers.remove(&observer);
    }

    pub fn is_observing_intersection(&self, observer: ObserverId, target: NodeKey) -> bool {
        self.intersections
            .observers
            .get(&observer)
            .is_some_and(|s| s.targets.iter().any(|t| t.node == target))
    }

    pub fn intersection_observer_count(&self) -> usize {
        self.intersections.observers.len()
    }

    pub fn take_intersection_entries(&mut self, observer: ObserverId) -> Vec<IntersectionEntry> {
        self.intersections
            .observers
            .get_mut(&observer)
            .map(|state| std::mem::take(&mut state.queue))
            .unwrap_or_default()
    }

    /// Recomputes every observed target against the current geometry. Returns the number
    /// of entries queued.
    pub fn update_intersections(&mut self) -> usize {
        let viewport = self.intersections.viewport;
        let mut changes = Vec::new();
        for (id, state) in &self.intersections.observers {
            let root = state.margin.apply(viewport);
            for (index, target) in state.targets.iter().enumerate() {
                let now = self.is_connected(target.node)
                    && self
                        .intersections
                        .boxes
                        .get(&target.node)
                        .is_some_and(|b| b.intersects(&root));
                if target.last != Some(now) {
                    changes.push((*id, index, now));
                }
            }
        }

        for &(id, index, now) in &changes {
            if let Some(state) = self.intersections.observers.get_mut(&id) {
                let target = &mut state.targets[index];
                target.last = Some(now);
                let entry = IntersectionEntry {
                    target: target.node,
                    is_intersecting: now,
                };
                state.queue.push(entry);
            }
        }
        changes.len()
    }
}
