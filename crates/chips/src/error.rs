use dom::{DomError, NodeKey};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChipsError {
    Config(String),
    Dom(DomError),
}

impl fmt::Display for ChipsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipsError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            ChipsError::Dom(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ChipsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChipsError::Dom(e) => Some(e),
            ChipsError::Config(_) => None,
        }
    }
}

impl From<DomError> for ChipsError {
    fn from(e: DomError) -> Self {
        ChipsError::Dom(e)
    }
}

/// Why a candidate ended up without injected content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadFailureReason {
    Fetch(String),
    EmptyMarkup,
    Dom(DomError),
}

impl fmt::Display for LoadFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailureReason::Fetch(e) => write!(f, "fetch failed: {e}"),
            LoadFailureReason::EmptyMarkup => write!(f, "markup is empty"),
            LoadFailureReason::Dom(e) => write!(f, "injection failed: {e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure {
    pub tag: String,
    pub element: NodeKey,
    pub reason: LoadFailureReason,
}
