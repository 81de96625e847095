//! Script elements and their execution hook.
//!
//! A script runs at most once: when it first becomes connected while its "already
//! started" flag is clear. Scripts produced by markup parsing (`set_inner_html`) start
//! with the flag set and never run, which matches what browsers do for `innerHTML`.
//! Execution itself is delegated to a `ScriptHost`.
use crate::document::Document;
use crate::error::DomError;
use crate::types::NodeKey;
use log::{debug, warn};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    Classic,
    Module,
}

impl ScriptKind {
    /// Maps a `type` attribute to a kind; `None` marks a data block that never runs.
    pub fn from_type_attribute(value: Option<&str>) -> Option<Self> {
        let Some(value) = value.map(str::trim) else {
            return Some(ScriptKind::Classic);
        };
        if value.eq_ignore_ascii_case("module") {
            return Some(ScriptKind::Module);
        }
        let classic = value.is_empty()
            || value.eq_ignore_ascii_case("text/javascript")
            || value.eq_ignore_ascii_case("application/javascript")
            || value.eq_ignore_ascii_case("text/ecmascript");
        classic.then_some(ScriptKind::Classic)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRun {
    pub element: NodeKey,
    pub kind: ScriptKind,
    pub source: String,
}

pub trait ScriptHost {
    fn execute(&mut self, doc: &mut Document, script: &ScriptRun) -> Result<(), DomError>;
}

impl<F> ScriptHost for F
where
    F: FnMut(&mut Document, &ScriptRun) -> Result<(), DomError>,
{
    fn execute(&mut self, doc: &mut Document, script: &ScriptRun) -> Result<(), DomError> {
        self(doc, script)
    }
}

#[derive(Default)]
pub(crate) struct ScriptQueue {
    pending: VecDeque<NodeKey>,
    host: Option<Box<dyn ScriptHost>>,
}

impl Document {
    pub fn set_script_host(&mut self, host: Box<dyn ScriptHost>) {
        self.scripts.host = Some(host);
    }

    pub fn pending_script_count(&self) -> usize {
        self.scripts.pending.len()
    }

    pub fn script_already_started(&self, key: NodeKey) -> bool {
        self.element(key).is_some_and(|e| e.already_started)
    }

    pub(crate) fn prepare_script(&mut self, key: NodeKey) {
        let Some(data) = self.element_mut(key) else {
            return;
        };
        if data.already_started {
            return;
        }
        data.already_started = true;
        self.scripts.pending.push_back(key);
    }

    /// Runs prepared scripts in the order they were connected, including scripts that
    /// running scripts connect. Returns how many ran. Without a host, scripts stay queued.
    pub fn flush_scripts(&mut self) -> usize {
        let mut ran = 0;
        while let Some(key) = self.scripts.pending.pop_front() {
            let Some(kind) = ScriptKind::from_type_attribute(self.attribute(key, "type")) else {
                debug!("script {} is a data block; skipped", key.0);
                continue;
            };
            let Some(mut host) = self.scripts.host.take() else {
                self.scripts.pending.push_front(key);
                break;
            };

            let run = ScriptRun {
                element: key,
                kind,
                source: self.text_content(key),
            };
            let result = host.execute(self, &run);
            if self.scripts.host.is_none() {
                self.scripts.host = Some(host);
            }
            if let Err(e) = result {
                warn!("script {} failed: {e}", key.0);
            }
            ran += 1;
        }
        ran
    }
}
