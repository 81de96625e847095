//! A small live DOM for hosting page-level loaders.
//!
//! The tree is an arena owned by [`Document`]. On top of it sit the pieces a loader
//! needs to observe: child-list mutation observers, intersection observers driven by
//! host-supplied geometry, custom element definitions with upgrade callbacks, and
//! script elements that run at most once through a pluggable [`ScriptHost`].
mod custom_elements;
mod document;
mod error;
mod intersection;
mod mutation;
mod scripts;
mod serialize;
mod types;

pub use crate::custom_elements::ElementConstructor;
pub use crate::document::Document;
pub use crate::error::DomError;
pub use crate::intersection::{IntersectionEntry, RootMargin};
pub use crate::mutation::{MutationObserverInit, MutationRecord};
pub use crate::scripts::{ScriptHost, ScriptKind, ScriptRun};
pub use crate::types::{ElementData, NodeKey, NodeKind, ObserverId, Rect, ShadowRootMode};
