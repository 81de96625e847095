use crate::error::ChipsError;
use dom::RootMargin;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_TARGET: &str = "_chips";
pub const FALLBACK_PATH: &str = "/components";
pub const DEFAULT_ROOT_MARGIN: &str = "10%";

/// Loader settings. Every field is optional; empty strings count as unset.
///
/// ```toml
/// target = "_chips"
/// path = "/parts"
/// base_url = "https://example.com/app/"
/// root_margin = "10%"
///
/// [paths]
/// "user-card" = "/shared/components"
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChipsConfig {
    pub target: String,
    pub path: Option<String>,
    pub paths: HashMap<String, String>,
    pub base_url: Option<String>,
    pub root_margin: String,
}

impl Default for ChipsConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            path: None,
            paths: HashMap::new(),
            base_url: None,
            root_margin: DEFAULT_ROOT_MARGIN.to_string(),
        }
    }
}

impl ChipsConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ChipsError> {
        toml::from_str(text).map_err(|e| ChipsError::Config(e.to_string()))
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn with_tag_path(mut self, tag: &str, path: &str) -> Self {
        self.paths.insert(tag.to_string(), path.to_string());
        self
    }

    /// Root container id.
    pub fn target(&self) -> &str {
        non_empty(Some(&self.target)).unwrap_or(DEFAULT_TARGET)
    }

    /// Container id for content loaded inside shadow trees hosted by `tag`.
    pub fn nested_target(&self, tag: &str) -> String {
        format!("{}_{tag}", self.target())
    }

    /// Per-tag override, then the default path, then `/components`.
    pub fn path_for(&self, tag: &str) -> &str {
        non_empty(self.paths.get(tag))
            .or_else(|| non_empty(self.path.as_ref()))
            .unwrap_or(FALLBACK_PATH)
    }

    pub fn base_url(&self) -> Option<&str> {
        non_empty(self.base_url.as_ref())
    }

    pub fn margin(&self) -> RootMargin {
        match RootMargin::parse(&self.root_margin) {
            Some(margin) => margin,
            None => {
                if !self.root_margin.trim().is_empty() {
                    warn!(
                        "root_margin `{}` is not `N%` or `Npx`; using {DEFAULT_ROOT_MARGIN}",
                        self.root_margin
                    );
                }
                RootMargin::Percent(10.0)
            }
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}
