//! Lazy loading of HTML fragments for custom-tag placeholders.
//!
//! A page declares placeholders such as `<user-card></user-card>`. [`Chips`] watches
//! the document (and every shadow root it comes across) for custom tags, waits until
//! an instance nears the viewport, fetches `{path}/{tag}.html` once per tag, and appends
//! the parsed markup, with working scripts, to a container element.
mod config;
mod container;
mod engine;
mod error;
mod fetcher;
mod gate;
mod inject;
mod monitor;
mod registry;
mod scripts;

pub use crate::config::{ChipsConfig, DEFAULT_ROOT_MARGIN, DEFAULT_TARGET, FALLBACK_PATH};
pub use crate::container::resolve_container;
pub use crate::engine::{CandidateState, Chips};
pub use crate::error::{ChipsError, LoadFailure, LoadFailureReason};
pub use crate::fetcher::{
    BusFetcher, FetchCompletion, Fetcher, MemoryFetcher, fragment_url, settle_fetch,
};
pub use crate::gate::GateSet;
pub use crate::inject::inject_markup;
pub use crate::monitor::{Discovered, MonitorTree, Scope};
pub use crate::registry::TagRegistry;
pub use crate::scripts::reactivate_scripts;
