use crate::custom_elements::CustomElementRegistry;
use crate::error::DomError;
use crate::intersection::IntersectionObservers;
use crate::mutation::MutationObservers;
use crate::scripts::ScriptQueue;
use crate::types::{ElementData, NodeKey, NodeKind, NodeRecord, ObserverId, ShadowRootMode};

/// A live document: an arena of nodes plus the observer, custom element and script
/// machinery hanging off it.
///
/// Invariants:
/// - A node has at most one parent; operations never create cycles (shadow hosts count
///   as ancestors of their shadow root's content).
/// - Shadow roots have no parent; they are reachable only through their host.
/// - Nodes are never freed. Removed nodes stay addressable and can be re-inserted.
pub struct Document {
    pub(crate) nodes: Vec<NodeRecord>,
    root: NodeKey,
    body: Option<NodeKey>,
    next_observer: u32,
    pub(crate) mutations: MutationObservers,
    pub(crate) intersections: IntersectionObservers,
    pub(crate) custom_elements: CustomElementRegistry,
    pub(crate) scripts: ScriptQueue,
}

impl Document {
    /// Empty page skeleton: `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeKey::INVALID,
            body: None,
            next_observer: 1,
            mutations: MutationObservers::default(),
            intersections: IntersectionObservers::default(),
            custom_elements: CustomElementRegistry::default(),
            scripts: ScriptQueue::default(),
        };
        doc.root = doc.push_node(NodeKind::Document);
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.attach_detached(doc.root, html);
        doc.attach_detached(html, head);
        doc.attach_detached(html, body);
        doc.body = Some(body);
        doc
    }

    /// Page skeleton whose body holds `markup`. Scripts in `markup` are inert.
    pub fn with_body_html(markup: &str) -> Result<Self, DomError> {
        let mut doc = Self::new();
        let body = doc.body().ok_or(DomError::MissingBody)?;
        doc.set_inner_html(body, markup)?;
        Ok(doc)
    }

    pub fn document(&self) -> NodeKey {
        self.root
    }

    pub fn body(&self) -> Option<NodeKey> {
        self.body
    }

    pub(crate) fn next_observer_id(&mut self) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        id
    }

    // --- node access ---

    pub(crate) fn slot(&self, key: NodeKey) -> Option<&NodeRecord> {
        key.index().and_then(|i| self.nodes.get(i))
    }

    pub(crate) fn slot_mut(&mut self, key: NodeKey) -> Option<&mut NodeRecord> {
        key.index().and_then(|i| self.nodes.get_mut(i))
    }

    pub(crate) fn node(&self, key: NodeKey) -> Result<&NodeRecord, DomError> {
        self.slot(key).ok_or(DomError::MissingNode(key))
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Result<&mut NodeRecord, DomError> {
        self.slot_mut(key).ok_or(DomError::MissingNode(key))
    }

    pub(crate) fn element(&self, key: NodeKey) -> Option<&ElementData> {
        match &self.slot(key)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, key: NodeKey) -> Option<&mut ElementData> {
        match &mut self.slot_mut(key)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.slot(key).is_some()
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.slot(key).map(|n| &n.kind)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.slot(key).and_then(|n| n.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.slot(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        self.element(key).is_some()
    }

    /// Canonical lowercase tag name.
    pub fn tag_name(&self, key: NodeKey) -> Option<&str> {
        self.element(key).map(|e| e.name.as_str())
    }

    /// Attribute value; valueless attributes read as `""`.
    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.element(key)?
            .attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn set_attribute(&mut self, key: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        let data = self.element_mut(key).ok_or(DomError::WrongNodeKind(key))?;
        let name = name.to_ascii_lowercase();
        match data.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = Some(value.to_string()),
            None => data.attributes.push((name, Some(value.to_string()))),
        }
        Ok(())
    }

    // --- node creation ---

    fn push_node(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey::from_index(self.nodes.len());
        self.nodes.push(NodeRecord::new(kind));
        key
    }

    /// Scripts created this way are not "already started" and run once connected.
    pub fn create_element(&mut self, name: &str) -> NodeKey {
        self.push_node(NodeKind::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
            shadow_root: None,
            upgraded: false,
            already_started: false,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        self.push_node(NodeKind::Comment(text.to_string()))
    }

    pub fn create_document_fragment(&mut self) -> NodeKey {
        self.push_node(NodeKind::Fragment)
    }

    /// Link a freshly created node without queueing records or running connection steps.
    fn attach_detached(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(rec) = self.slot_mut(parent) {
            rec.children.push(child);
        }
        if let Some(rec) = self.slot_mut(child) {
            rec.parent = Some(parent);
        }
    }

    /// Build a parsed tree. Parser-created scripts are marked already started.
    fn build_parsed(&mut self, node: html::Node) -> NodeKey {
        let mut top = NodeKey::INVALID;
        let mut stack: Vec<(html::Node, Option<NodeKey>)> = vec![(node, None)];
        while let Some((node, parent)) = stack.pop() {
            let (key, children) = match node {
                html::Node::Element {
                    name,
                    attributes,
                    children,
                } => {
                    let already_started = name == "script";
                    let key = self.push_node(NodeKind::Element(ElementData {
                        name,
                        attributes,
                        shadow_root: None,
                        upgraded: false,
                        already_started,
                    }));
                    (key, children)
                }
                html::Node::Text { text } => (self.push_node(NodeKind::Text(text)), Vec::new()),
                html::Node::Comment { text } => {
                    (self.push_node(NodeKind::Comment(text)), Vec::new())
                }
            };
            match parent {
                Some(parent) => self.attach_detached(parent, key),
                None => top = key,
            }
            for child in children.into_iter().rev() {
                stack.push((child, Some(key)));
            }
        }
        top
    }

    // --- tree mutation ---

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `before` (or at the end). Inserting a fragment moves its
    /// children, in order, and leaves the fragment empty.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        before: Option<NodeKey>,
    ) -> Result<(), DomError> {
        self.validate_insert(parent, child, before)?;

        let mut before = before;
        if before == Some(child) {
            before = self.next_sibling(child);
        }

        let nodes = if matches!(self.node(child)?.kind, NodeKind::Fragment) {
            let moved = std::mem::take(&mut self.node_mut(child)?.children);
            for &key in &moved {
                if let Some(rec) = self.slot_mut(key) {
                    rec.parent = None;
                }
            }
            if !moved.is_empty() {
                self.queue_child_list(child, Vec::new(), moved.clone());
            }
            moved
        } else {
            if let Some(old_parent) = self.node(child)?.parent {
                self.detach(old_parent, child);
            }
            vec![child]
        };

        self.splice(parent, nodes, before)
    }

    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::InvalidSibling {
                parent,
                before: child,
            });
        }
        self.detach(parent, child);
        Ok(())
    }

    /// Replace the children of `target` with parsed `markup`, the way `innerHTML` does.
    pub fn set_inner_html(&mut self, target: NodeKey, markup: &str) -> Result<(), DomError> {
        let rec = self.node(target)?;
        if !rec.allows_children() || matches!(rec.kind, NodeKind::Document) {
            return Err(DomError::WrongNodeKind(target));
        }

        let old = std::mem::take(&mut self.node_mut(target)?.children);
        for &key in &old {
            if let Some(rec) = self.slot_mut(key) {
                rec.parent = None;
            }
        }
        if !old.is_empty() {
            self.queue_child_list(target, Vec::new(), old);
        }

        let keys: Vec<NodeKey> = html::parse_fragment(markup)
            .into_iter()
            .map(|node| self.build_parsed(node))
            .collect();
        self.splice(target, keys, None)
    }

    fn validate_insert(
        &self,
        parent: NodeKey,
        child: NodeKey,
        before: Option<NodeKey>,
    ) -> Result<(), DomError> {
        if !self.node(parent)?.allows_children() {
            return Err(DomError::InvalidParent(parent));
        }
        if matches!(
            self.node(child)?.kind,
            NodeKind::Document | NodeKind::ShadowRoot { .. }
        ) {
            return Err(DomError::InvalidChild(child));
        }
        if self.is_host_including_inclusive_ancestor(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        if let Some(before) = before {
            if self.node(before)?.parent != Some(parent) {
                return Err(DomError::InvalidSibling { parent, before });
            }
        }
        Ok(())
    }

    fn is_host_including_inclusive_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let mut current = Some(node);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = match self.kind(key) {
                Some(NodeKind::ShadowRoot { host, .. }) => Some(*host),
                _ => self.parent(key),
            };
        }
        false
    }

    fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|k| *k == key)?;
        siblings.get(pos + 1).copied()
    }

    fn detach(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(rec) = self.slot_mut(parent) {
            rec.children.retain(|k| *k != child);
        }
        if let Some(rec) = self.slot_mut(child) {
            rec.parent = None;
        }
        self.queue_child_list(parent, Vec::new(), vec![child]);
    }

    /// Insert already-detached nodes and run the insertion steps.
    fn splice(
        &mut self,
        parent: NodeKey,
        nodes: Vec<NodeKey>,
        before: Option<NodeKey>,
    ) -> Result<(), DomError> {
        if nodes.is_empty() {
            return Ok(());
        }

        let siblings = &mut self.node_mut(parent)?.children;
        let at = match before {
            Some(before) => siblings
                .iter()
                .position(|k| *k == before)
                .ok_or(DomError::InvalidSibling { parent, before })?,
            None => siblings.len(),
        };
        siblings.splice(at..at, nodes.iter().copied());
        for &key in &nodes {
            if let Some(rec) = self.slot_mut(key) {
                rec.parent = Some(parent);
            }
        }

        self.queue_child_list(parent, nodes.clone(), Vec::new());
        if self.is_connected(parent) {
            self.run_connection_steps(&nodes);
        }
        Ok(())
    }

    /// Scripts get prepared and defined custom elements get upgraded, in
    /// shadow-including tree order.
    fn run_connection_steps(&mut self, inserted: &[NodeKey]) {
        let mut upgrades = Vec::new();
        for &root in inserted {
            for key in self.shadow_including_inclusive_descendants(root) {
                if self.tag_name(key) == Some("script") {
                    self.prepare_script(key);
                }
                if self.is_upgradeable(key) {
                    upgrades.push(key);
                }
            }
        }
        self.upgrade(upgrades);
    }

    // --- shadow trees ---

    pub fn attach_shadow(&mut self, host: NodeKey, mode: ShadowRootMode) -> Result<NodeKey, DomError> {
        let data = self.element(host).ok_or(DomError::WrongNodeKind(host))?;
        if data.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }
        let root = self.push_node(NodeKind::ShadowRoot { host, mode });
        if let Some(data) = self.element_mut(host) {
            data.shadow_root = Some(root);
        }
        Ok(root)
    }

    /// The host's shadow root, open or closed. Hosts see through the mode.
    pub fn shadow_root(&self, host: NodeKey) -> Option<NodeKey> {
        self.element(host).and_then(|e| e.shadow_root)
    }

    pub fn shadow_host(&self, root: NodeKey) -> Option<NodeKey> {
        match self.kind(root)? {
            NodeKind::ShadowRoot { host, .. } => Some(*host),
            _ => None,
        }
    }

    // --- queries ---

    /// Connected means the node's host-including root is this document.
    pub fn is_connected(&self, key: NodeKey) -> bool {
        let mut current = key;
        loop {
            match self.kind(current) {
                Some(NodeKind::Document) => return true,
                Some(NodeKind::ShadowRoot { host, .. }) => current = *host,
                Some(_) => match self.parent(current) {
                    Some(parent) => current = parent,
                    None => return false,
                },
                None => return false,
            }
        }
    }

    /// Descendants of `root` in tree order, excluding `root`, not entering shadow trees.
    pub fn descendants(&self, root: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(root).iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        out
    }

    /// `root` and its descendants, descending into shadow roots right after their host.
    pub fn shadow_including_inclusive_descendants(&self, root: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.children(key).iter().rev().copied());
            if let Some(shadow) = self.shadow_root(key) {
                stack.push(shadow);
            }
        }
        out
    }

    pub fn elements_by_tag_name(&self, root: NodeKey, name: &str) -> Vec<NodeKey> {
        self.descendants(root)
            .into_iter()
            .filter(|k| self.tag_name(*k).is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .collect()
    }

    /// First element in the document tree with a matching `id`. Shadow trees are not searched.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.descendants(self.root)
            .into_iter()
            .find(|k| self.attribute(*k, "id") == Some(id))
    }

    pub fn text_content(&self, key: NodeKey) -> String {
        if let Some(NodeKind::Text(text)) = self.kind(key) {
            return text.clone();
        }
        let mut out = String::new();
        for k in self.descendants(key) {
            if let Some(NodeKind::Text(text)) = self.kind(k) {
                out.push_str(text);
            }
        }
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
