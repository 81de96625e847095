use crate::types::{NodeKey, ObserverId};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomError {
    MissingNode(NodeKey),
    WrongNodeKind(NodeKey),
    InvalidParent(NodeKey),
    InvalidChild(NodeKey),
    InvalidSibling { parent: NodeKey, before: NodeKey },
    CycleDetected { parent: NodeKey, child: NodeKey },
    ShadowRootExists(NodeKey),
    InvalidCustomElementName(String),
    AlreadyDefined(String),
    UnknownObserver(ObserverId),
    MissingBody,
    Script(String),
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::MissingNode(key) => write!(f, "node {} does not exist", key.0),
            DomError::WrongNodeKind(key) => write!(f, "node {} has the wrong kind", key.0),
            DomError::InvalidParent(key) => write!(f, "node {} cannot have children", key.0),
            DomError::InvalidChild(key) => write!(f, "node {} cannot be inserted", key.0),
            DomError::InvalidSibling { parent, before } => {
                write!(f, "node {} is not a child of {}", before.0, parent.0)
            }
            DomError::CycleDetected { parent, child } => {
                write!(f, "inserting {} under {} would create a cycle", child.0, parent.0)
            }
            DomError::ShadowRootExists(key) => {
                write!(f, "element {} already hosts a shadow root", key.0)
            }
            DomError::InvalidCustomElementName(name) => {
                write!(f, "`{name}` is not a valid custom element name")
            }
            DomError::AlreadyDefined(name) => write!(f, "`{name}` is already defined"),
            DomError::UnknownObserver(id) => write!(f, "observer {} is not registered", id.0),
            DomError::MissingBody => write!(f, "document has no body element"),
            DomError::Script(msg) => write!(f, "script error: {msg}"),
        }
    }
}

impl std::error::Error for DomError {}
