use std::sync::{
    Arc, Mutex,
    mpsc::{Receiver, Sender},
};
use std::thread::{self, JoinHandle};

use bus::{CoreCommand, CoreEvent};
use log::{debug, trace};
use net::{FetchResult, fetch_text};

/// Serves fetch commands until every command sender is gone. Each fetch runs on its own
/// worker; completions are sent back in the order they finish.
pub fn start_net_runtime(
    cmd_rx: Receiver<CoreCommand>,
    evt_tx: Sender<CoreEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                CoreCommand::FetchFragment { request_id, url } => {
                    debug!("request {request_id}: fetching {url}");
                    let evt_tx = Mutex::new(evt_tx.clone());
                    fetch_text(
                        url,
                        Arc::new(move |r: FetchResult| {
                            let evt = match r.error {
                                None => CoreEvent::FragmentLoaded {
                                    request_id,
                                    url: r.requested_url,
                                    body: r.body,
                                },
                                Some(error) => CoreEvent::FragmentFailed {
                                    request_id,
                                    url: r.requested_url,
                                    error,
                                },
                            };
                            if let Ok(tx) = evt_tx.lock() {
                                // The engine may be gone; nothing left to notify.
                                let _ = tx.send(evt);
                            }
                        }),
                    );
                }
            }
        }
        trace!("net runtime stopped");
    })
}
