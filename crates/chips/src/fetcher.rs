//! Fragment retrieval.
//!
//! The engine issues requests with `Fetcher::start` and collects completions later, so
//! the fetch is the one place where a load suspends.
use bus::{Bus, CoreCommand, CoreEvent};
use core_types::RequestId;
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchCompletion {
    pub request_id: RequestId,
    pub url: String,
    pub result: Result<String, String>,
}

pub trait Fetcher {
    /// Issue one retrieval. There are no retries.
    fn start(&mut self, request_id: RequestId, url: &str);

    /// Completions that are ready now.
    fn poll(&mut self) -> Vec<FetchCompletion>;

    /// Block for at most `timeout` until at least one completion is ready.
    fn wait(&mut self, timeout: Duration) -> Vec<FetchCompletion>;
}

/// `{path}/{tag}.html`, joined against `base` when there is one.
pub fn fragment_url(base: Option<&Url>, path: &str, tag: &str) -> Result<String, url::ParseError> {
    let relative = format!("{}/{tag}.html", path.trim_end_matches('/'));
    match base {
        Some(base) => Ok(base.join(&relative)?.to_string()),
        None => Ok(relative),
    }
}

/// Turns a completion into markup; failures are logged and become `None`.
pub fn settle_fetch(tag: &str, result: Result<String, String>) -> Option<String> {
    match result {
        Ok(body) => Some(body),
        Err(error) => {
            warn!("Component <{tag}> could not be fetched: {error}");
            None
        }
    }
}

#[derive(Default)]
struct MemoryState {
    routes: HashMap<String, Result<String, String>>,
    requests: Vec<String>,
    ready: VecDeque<FetchCompletion>,
    held: Vec<FetchCompletion>,
    hold: bool,
}

/// Serves fragments from memory. Clones share state, so a test can keep a handle after
/// passing one to the engine.
#[derive(Clone, Default)]
pub struct MemoryFetcher {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, body: &str) -> &Self {
        self.state
            .borrow_mut()
            .routes
            .insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn fail(&self, url: &str, error: &str) -> &Self {
        self.state
            .borrow_mut()
            .routes
            .insert(url.to_string(), Err(error.to_string()));
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.state.borrow().requests.clone()
    }

    /// While holding, requests stay in flight until `release`.
    pub fn hold(&self, hold: bool) {
        self.state.borrow_mut().hold = hold;
    }

    pub fn release(&self) {
        let mut state = self.state.borrow_mut();
        let held = std::mem::take(&mut state.held);
        state.ready.extend(held);
    }
}

impl Fetcher for MemoryFetcher {
    fn start(&mut self, request_id: RequestId, url: &str) {
        let mut state = self.state.borrow_mut();
        state.requests.push(url.to_string());
        let result = state
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(format!("404 Not Found: {url}")));
        let completion = FetchCompletion {
            request_id,
            url: url.to_string(),
            result,
        };
        if state.hold {
            state.held.push(completion);
        } else {
            state.ready.push_back(completion);
        }
    }

    fn poll(&mut self) -> Vec<FetchCompletion> {
        self.state.borrow_mut().ready.drain(..).collect()
    }

    fn wait(&mut self, _timeout: Duration) -> Vec<FetchCompletion> {
        self.poll()
    }
}

/// Fetches over the command bus, served by the `runtime_net` worker.
pub struct BusFetcher {
    cmd_tx: Sender<CoreCommand>,
    evt_rx: Receiver<CoreEvent>,
    // Detached on drop; the worker loop ends once `cmd_tx` closes.
    _runtime: JoinHandle<()>,
}

impl BusFetcher {
    /// Starts a dedicated net runtime. It stops when the fetcher is dropped.
    pub fn spawn() -> Self {
        let (bus, cmd_rx) = Bus::new();
        let runtime = runtime_net::start_net_runtime(cmd_rx, bus.evt_tx);
        Self {
            cmd_tx: bus.cmd_tx,
            evt_rx: bus.evt_rx,
            _runtime: runtime,
        }
    }
}

fn completion(evt: CoreEvent) -> FetchCompletion {
    match evt {
        CoreEvent::FragmentLoaded {
            request_id,
            url,
            body,
        } => FetchCompletion {
            request_id,
            url,
            result: Ok(body),
        },
        CoreEvent::FragmentFailed {
            request_id,
            url,
            error,
        } => FetchCompletion {
            request_id,
            url,
            result: Err(error),
        },
    }
}

impl Fetcher for BusFetcher {
    fn start(&mut self, request_id: RequestId, url: &str) {
        let cmd = CoreCommand::FetchFragment {
            request_id,
            url: url.to_string(),
        };
        if self.cmd_tx.send(cmd).is_err() {
            warn!("net runtime is gone; request {request_id} for {url} dropped");
        }
    }

    fn poll(&mut self) -> Vec<FetchCompletion> {
        let mut out = Vec::new();
        loop {
            match self.evt_rx.try_recv() {
                Ok(evt) => out.push(completion(evt)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("net event channel closed");
                    break;
                }
            }
        }
        out
    }

    fn wait(&mut self, timeout: Duration) -> Vec<FetchCompletion> {
        match self.evt_rx.recv_timeout(timeout) {
            Ok(evt) => {
                let mut out = vec![completion(evt)];
                out.extend(self.poll());
                out
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Vec::new(),
        }
    }
}
