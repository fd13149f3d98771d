use super::sse::SseDecoder;
use crate::progress::ProgressEvent;
use anyhow::{anyhow, Context as _, Result};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Url;
use std::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Message(ProgressEvent),
    Malformed(String),
    Disconnected { connection: u64, reason: String },
}

#[derive(Debug)]
enum ListenerState {
    Idle,
    Live {
        connection: u64,
        // Dropping the sender stops the worker.
        _shutdown: oneshot::Sender<()>,
    },
    Failed {
        revision: u64,
    },
}

/// Owns the single push connection to the progress endpoint.
///
/// At most one connection is live at a time. After a transport error the
/// listener stays down until the tracked file list changes.
#[derive(Debug)]
pub struct ProgressListener {
    state: ListenerState,
    next_connection: u64,
    last_revision: u64,
    sender: Sender<StreamEvent>,
    receiver: Receiver<StreamEvent>,
}

impl Default for ProgressListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            state: ListenerState::Idle,
            next_connection: 0,
            last_revision: 0,
            sender,
            receiver,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, ListenerState::Live { .. })
    }

    /// Opens the connection unless one is already live. Returns whether a
    /// new connection was started.
    pub fn ensure_open(&mut self, endpoint: &Url, revision: u64) -> bool {
        self.last_revision = revision;

        match self.state {
            ListenerState::Live { .. } => return false,
            ListenerState::Failed { revision: failed_at } if failed_at == revision => {
                return false
            }
            _ => {}
        }

        let connection = self.next_connection;
        self.next_connection += 1;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        log::info!("Establishing progress stream connection {} to {}", connection, endpoint);
        spawn_connection(connection, endpoint.clone(), self.sender.clone(), shutdown_rx);

        self.state = ListenerState::Live {
            connection,
            _shutdown: shutdown_tx,
        };
        true
    }

    pub fn close(&mut self) {
        if let ListenerState::Live { connection, .. } = self.state {
            log::info!("Closing progress stream connection {}", connection);
        }
        self.state = ListenerState::Idle;
    }

    /// Drains pending worker events. A disconnect of the live connection
    /// moves the listener to the failed state.
    pub fn poll_events(&mut self) -> Vec<StreamEvent> {
        let events: Vec<StreamEvent> = self.receiver.try_iter().collect();
        for event in &events {
            self.observe(event);
        }
        events
    }

    fn observe(&mut self, event: &StreamEvent) {
        if let StreamEvent::Disconnected { connection, .. } = event {
            if matches!(self.state, ListenerState::Live { connection: live, .. } if live == *connection)
            {
                self.state = ListenerState::Failed {
                    revision: self.last_revision,
                };
            }
        }
    }
}

impl Drop for ProgressListener {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_connection(
    connection: u64,
    endpoint: Url,
    sender: Sender<StreamEvent>,
    shutdown: oneshot::Receiver<()>,
) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                let _ = sender.send(StreamEvent::Disconnected {
                    connection,
                    reason: e.to_string(),
                });
                return;
            }
        };

        rt.block_on(async {
            tokio::select! {
                _ = shutdown => {
                    log::debug!("Progress stream connection {} shut down", connection);
                }
                result = read_stream(&endpoint, &sender) => {
                    let reason = match result {
                        Ok(()) => "server closed the stream".to_string(),
                        Err(e) => format!("{:#}", e),
                    };
                    log::warn!("Progress stream connection {} lost: {}", connection, reason);
                    let _ = sender.send(StreamEvent::Disconnected { connection, reason });
                }
            }
        });
    });
}

async fn read_stream(endpoint: &Url, sender: &Sender<StreamEvent>) -> Result<()> {
    let res = reqwest::Client::new()
        .get(endpoint.clone())
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await
        .context("Failed to connect to progress stream")?;

    if !res.status().is_success() {
        return Err(anyhow!("Progress stream returned status {}", res.status()));
    }

    let mut decoder = SseDecoder::new();
    let mut body = res.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("Progress stream read failed")?;
        for payload in decoder.feed(&chunk)? {
            log::debug!("Progress message received: {}", payload);
            let event = match serde_json::from_str::<ProgressEvent>(&payload) {
                Ok(progress) => StreamEvent::Message(progress),
                Err(e) => StreamEvent::Malformed(format!("{} ({})", payload, e)),
            };
            if sender.send(event).is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}
