use crate::config::ChipsConfig;
use crate::container::resolve_container;
use crate::error::{ChipsError, LoadFailure, LoadFailureReason};
use crate::fetcher::{FetchCompletion, Fetcher, fragment_url, settle_fetch};
use crate::gate::GateSet;
use crate::inject::inject_markup;
use crate::monitor::{Discovered, MonitorTree};
use crate::registry::TagRegistry;
use crate::scripts::reactivate_scripts;
use core_types::RequestId;
use dom::{Document, DomError, NodeKey, RootMargin};
use log::{debug, info, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use url::Url;

/// Where a custom-tag element is in its load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateState {
    Discovered,
    Gated,
    Triggered,
    Loading,
    Injected,
    Failed,
    /// Another element already claimed the tag.
    Skipped,
}

/// A claimed candidate waiting for its gate, then for its fetch.
#[derive(Clone, Debug)]
struct PendingLoad {
    element: NodeKey,
    tag: String,
    url: String,
    container: NodeKey,
}

/// The loader. It owns the tag registry, the monitors, the gates and the fetches in
/// flight; the document is passed in on every call.
///
/// Nothing happens on its own: the host calls `pump` from its event loop (or
/// `run_until_idle`), after updating layout boxes and the viewport.
pub struct Chips {
    config: ChipsConfig,
    base_url: Option<Url>,
    margin: RootMargin,
    registry: TagRegistry,
    root_container: NodeKey,
    monitors: MonitorTree,
    gates: GateSet<PendingLoad>,
    fetcher: Box<dyn Fetcher>,
    next_request: RequestId,
    in_flight: HashMap<RequestId, PendingLoad>,
    states: HashMap<NodeKey, CandidateState>,
    awaiting_definition: BTreeMap<String, Vec<NodeKey>>,
    failures: Vec<LoadFailure>,
}

impl Chips {
    pub fn start(
        doc: &mut Document,
        config: ChipsConfig,
        fetcher: Box<dyn Fetcher>,
    ) -> Result<Self, ChipsError> {
        Self::start_with_registry(doc, config, fetcher, TagRegistry::new())
    }

    /// Like `start`, with a registry that may already hold claims.
    pub fn start_with_registry(
        doc: &mut Document,
        config: ChipsConfig,
        fetcher: Box<dyn Fetcher>,
        registry: TagRegistry,
    ) -> Result<Self, ChipsError> {
        let base_url = match config.base_url() {
            Some(raw) => Some(
                Url::parse(raw).map_err(|e| ChipsError::Config(format!("base_url `{raw}`: {e}")))?,
            ),
            None => None,
        };
        let margin = config.margin();
        let root_container = resolve_container(doc, config.target())?;

        let mut chips = Chips {
            config,
            base_url,
            margin,
            registry,
            root_container,
            monitors: MonitorTree::new(),
            gates: GateSet::new(),
            fetcher,
            next_request: 1,
            in_flight: HashMap::new(),
            states: HashMap::new(),
            awaiting_definition: BTreeMap::new(),
            failures: Vec::new(),
        };
        let root = doc.document();
        chips.monitor_scope(doc, root, root_container)?;
        info!(
            "chips started: container #{}, {} candidate(s) gated",
            chips.config.target(),
            chips.gates.len()
        );
        Ok(chips)
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Forget every claim. Elements already processed are not revisited.
    pub fn reset_registry(&mut self) {
        self.registry.reset();
    }

    pub fn config(&self) -> &ChipsConfig {
        &self.config
    }

    pub fn root_container(&self) -> NodeKey {
        self.root_container
    }

    /// `None` for elements that were never reported or are not custom tags.
    pub fn candidate_state(&self, element: NodeKey) -> Option<CandidateState> {
        self.states.get(&element).copied()
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn is_monitoring(&self, scope_root: NodeKey) -> bool {
        self.monitors.is_monitoring(scope_root)
    }

    pub fn monitored_scopes(&self) -> usize {
        self.monitors.len()
    }

    pub fn pending_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// One turn of the event loop: run scripts, deliver definitions, mutation records,
    /// intersection changes and fetch completions, in that order. Returns how much
    /// happened; zero means the loader is waiting on the host or the network.
    pub fn pump(&mut self, doc: &mut Document) -> usize {
        let mut work = doc.flush_scripts();

        for name in doc.take_defined_names() {
            if let Some(hosts) = self.awaiting_definition.remove(&name) {
                debug!("<{name}> defined; checking {} host(s) for shadow roots", hosts.len());
                for host in hosts {
                    self.watch_shadow(doc, host, &name);
                }
                work += 1;
            }
        }

        let discovered = self.monitors.take_discovered(doc);
        work += discovered.len();
        for found in discovered {
            self.classify(doc, found);
        }

        work += doc.update_intersections();
        for load in self.gates.take_triggered(doc) {
            self.begin_load(load);
            work += 1;
        }

        for completion in self.fetcher.poll() {
            self.finish_load(doc, completion);
            work += 1;
        }
        work
    }

    /// Pumps until there is nothing left to do and nothing in flight. Returns false if
    /// `timeout` ran out first or the fetcher stalled.
    pub fn run_until_idle(&mut self, doc: &mut Document, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let work = self.pump(doc);
            let now = Instant::now();
            if work > 0 {
                if now >= deadline {
                    return false;
                }
                continue;
            }
            if self.in_flight.is_empty() {
                return true;
            }
            if now >= deadline {
                return false;
            }

            let completions = self.fetcher.wait(deadline - now);
            if completions.is_empty() {
                return false;
            }
            for completion in completions {
                self.finish_load(doc, completion);
            }
        }
    }

    /// Disconnect every monitor and gate. Fetches in flight are left to finish unheard.
    pub fn shutdown(&mut self, doc: &mut Document) {
        self.monitors.disconnect_all(doc);
        self.gates.disconnect_all(doc);
        self.awaiting_definition.clear();
        debug!("chips shut down with {} fetch(es) in flight", self.in_flight.len());
    }

    fn monitor_scope(
        &mut self,
        doc: &mut Document,
        root: NodeKey,
        container: NodeKey,
    ) -> Result<(), DomError> {
        let Some(scope) = self.monitors.attach(doc, root, container)? else {
            return Ok(());
        };
        for found in self.monitors.sweep(doc, &scope) {
            self.classify(doc, found);
        }
        Ok(())
    }

    /// Decide what to do with a reported element. The claim happens here, before any
    /// fetch is issued, so a second instance of the same tag is always skipped.
    fn classify(&mut self, doc: &mut Document, found: Discovered) {
        let element = found.element;
        let Some(tag) = doc.tag_name(element).map(str::to_string) else {
            return;
        };
        if !html::is_custom_tag(&tag) {
            trace!("<{tag}> is not a custom tag");
            return;
        }

        if !self.states.contains_key(&element) {
            if self.registry.is_loadable(&tag) {
                self.gate(doc, found, tag.clone());
            } else {
                trace!("<{tag}> already claimed; element {} skipped", element.0);
                self.states.insert(element, CandidateState::Skipped);
            }
        }
        self.watch_shadow(doc, element, &tag);
    }

    fn gate(&mut self, doc: &mut Document, found: Discovered, tag: String) {
        let element = found.element;
        self.states.insert(element, CandidateState::Discovered);
        let path = self.config.path_for(&tag);
        let url = fragment_url(self.base_url.as_ref(), path, &tag);
        self.registry.claim(&tag);

        let url = match url {
            Ok(url) => url,
            Err(e) => {
                warn!("Component <{tag}> could not be fetched: bad fragment url: {e}");
                let reason = LoadFailureReason::Fetch(format!("bad fragment url: {e}"));
                self.record_failure(&tag, element, reason);
                return;
            }
        };
        let load = PendingLoad {
            element,
            tag,
            url,
            container: found.container,
        };
        debug!("<{}> claimed; waiting for {} to near the viewport", load.tag, load.url);
        let tag = load.tag.clone();
        match self.gates.attach(doc, element, self.margin, load) {
            Ok(_) => {
                self.states.insert(element, CandidateState::Gated);
            }
            Err(e) => self.fail(&tag, element, LoadFailureReason::Dom(e)),
        }
    }

    fn begin_load(&mut self, load: PendingLoad) {
        self.states.insert(load.element, CandidateState::Triggered);
        let request_id = self.next_request;
        self.next_request += 1;

        debug!("<{}> triggered; request {request_id} for {}", load.tag, load.url);
        self.fetcher.start(request_id, &load.url);
        self.states.insert(load.element, CandidateState::Loading);
        self.in_flight.insert(request_id, load);
    }

    fn finish_load(&mut self, doc: &mut Document, completion: FetchCompletion) {
        let Some(load) = self.in_flight.remove(&completion.request_id) else {
            debug!("ignoring completion for unknown request {}", completion.request_id);
            return;
        };

        let fetch_error = completion.result.as_ref().err().cloned();
        let markup = settle_fetch(&load.tag, completion.result);
        match fetch_error {
            Some(error) => self.fail(&load.tag, load.element, LoadFailureReason::Fetch(error)),
            None => match self.inject(doc, &load, markup.as_deref()) {
                Ok(true) => {
                    self.states.insert(load.element, CandidateState::Injected);
                    debug!("<{}> injected into container {}", load.tag, load.container.0);
                }
                Ok(false) => {
                    warn!("<{}> is blank", load.tag);
                    self.record_failure(&load.tag, load.element, LoadFailureReason::EmptyMarkup);
                }
                Err(e) => self.fail(&load.tag, load.element, LoadFailureReason::Dom(e)),
            },
        }

        self.watch_shadow(doc, load.element, &load.tag);
    }

    /// Inject, reactivate, append, then run the new scripts. `Ok(false)` when there was
    /// nothing to inject.
    fn inject(
        &mut self,
        doc: &mut Document,
        load: &PendingLoad,
        markup: Option<&str>,
    ) -> Result<bool, DomError> {
        let Some(fragment) = inject_markup(doc, markup)? else {
            return Ok(false);
        };
        let scripts = reactivate_scripts(doc, Some(fragment))?;
        doc.append_child(load.container, fragment)?;
        let ran = doc.flush_scripts();
        trace!("<{}>: {scripts} script(s) reactivated, {ran} ran", load.tag);
        Ok(true)
    }

    /// Attach a nested monitor if `host` has a shadow root, or wait for its tag to be
    /// defined when it has none yet.
    fn watch_shadow(&mut self, doc: &mut Document, host: NodeKey, tag: &str) {
        let Some(shadow) = doc.shadow_root(host) else {
            if !doc.is_defined(tag) {
                let hosts = self.awaiting_definition.entry(tag.to_string()).or_default();
                if !hosts.contains(&host) {
                    hosts.push(host);
                }
            }
            return;
        };
        if self.monitors.is_monitoring(shadow) {
            return;
        }

        let id = self.config.nested_target(tag);
        let attached = resolve_container(doc, &id)
            .and_then(|container| self.monitor_scope(doc, shadow, container));
        match attached {
            Ok(()) => debug!("<{tag}> exposes a shadow root; monitoring into #{id}"),
            Err(e) => warn!("could not monitor the shadow root of <{tag}>: {e}"),
        }
    }

    fn fail(&mut self, tag: &str, element: NodeKey, reason: LoadFailureReason) {
        if !matches!(reason, LoadFailureReason::Fetch(_)) {
            warn!("<{tag}> failed to load: {reason}");
        }
        self.record_failure(tag, element, reason);
    }

    fn record_failure(&mut self, tag: &str, element: NodeKey, reason: LoadFailureReason) {
        self.states.insert(element, CandidateState::Failed);
        self.failures.push(LoadFailure {
            tag: tag.to_string(),
            element,
            reason,
        });
    }
}
