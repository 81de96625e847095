use html::Attributes;

/// Stable node identity within one `Document`. Keys are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u32);

impl NodeKey {
    /// Reserved sentinel for "no node".
    pub const INVALID: NodeKey = NodeKey(0);

    pub(crate) fn from_index(index: usize) -> Self {
        NodeKey(index as u32 + 1)
    }

    pub(crate) fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

/// Handle for a mutation or intersection observer. Ids are allocated from one counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

/// A rectangle in CSS px units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Edge-adjacent rectangles count as intersecting, so zero-area boxes on the
    /// viewport edge are reported.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    pub fn inflate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowRootMode {
    Open,
    Closed,
}

#[derive(Debug)]
pub struct ElementData {
    pub name: String,
    pub attributes: Attributes,
    pub shadow_root: Option<NodeKey>,
    /// Custom element reactions already ran for this element.
    pub upgraded: bool,
    /// Script "already started" flag; parser-created scripts start out set.
    pub already_started: bool,
}

#[derive(Debug)]
pub enum NodeKind {
    Document,
    Fragment,
    ShadowRoot { host: NodeKey, mode: ShadowRootMode },
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug)]
pub(crate) struct NodeRecord {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
}

impl NodeRecord {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn allows_children(&self) -> bool {
        !matches!(self.kind, NodeKind::Text(_) | NodeKind::Comment(_))
    }
}
