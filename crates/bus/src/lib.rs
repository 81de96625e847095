use core_types::RequestId;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug)]
pub enum CoreCommand {
    // Network requests
    FetchFragment { request_id: RequestId, url: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum CoreEvent {
    // Network -> engine
    FragmentLoaded {
        request_id: RequestId,
        url: String,
        body: String,
    },
    FragmentFailed {
        request_id: RequestId,
        url: String,
        error: String,
    },
}

pub struct Bus {
    pub cmd_tx: Sender<CoreCommand>,
    pub evt_rx: Receiver<CoreEvent>,
    pub evt_tx: Sender<CoreEvent>, // shareable for runtimes
}

impl Bus {
    /// Builds both channels. The returned receiver is the runtime's end of the command channel.
    pub fn new() -> (Bus, Receiver<CoreCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        (
            Bus {
                cmd_tx,
                evt_rx,
                evt_tx,
            },
            cmd_rx,
        )
    }
}
