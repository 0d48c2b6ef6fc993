//! Best-effort announcement channel over WebSocket.
//!
//! Every connected socket receives the server's own [`Announcement`]s plus
//! any text frame another socket sent. Nothing is stored or retried; a socket
//! that falls behind skips what it missed.

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use pinboard_common::model::post::{Post, PostId};
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum Announcement {
    PostAdded(Post),
    PostUpdated(Post),
    PostDeleted(PostId),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub(crate) struct ConnectionId(u64);

/// One frame on its way to every socket but the one it came from.
#[derive(Clone, Debug)]
pub(crate) struct Envelope {
    origin: Option<ConnectionId>,
    pub(crate) text: Utf8Bytes,
}

impl Envelope {
    fn is_for(&self, connection: ConnectionId) -> bool {
        self.origin != Some(connection)
    }
}

#[derive(Clone, Debug)]
pub struct EventHub {
    sender: broadcast::Sender<Envelope>,
    next_connection: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl EventHub {
    /// Sockets served by this hub close once `shutdown` is cancelled.
    #[must_use]
    pub fn new(shutdown: CancellationToken) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            sender,
            next_connection: Arc::new(AtomicU64::new(0)),
            shutdown,
        }
    }

    pub fn publish(&self, announcement: &Announcement) {
        match serde_json::to_string(announcement) {
            Ok(text) => self.send(Envelope {
                origin: None,
                text: text.into(),
            }),
            Err(err) => warn!(error = %err, "Announcement could not be serialized"),
        }
    }

    #[must_use]
    pub fn connections(&self) -> usize {
        self.sender.receiver_count()
    }

    fn send(&self, envelope: Envelope) {
        if self.sender.send(envelope).is_err() {
            debug!("No sockets are listening for announcements");
        }
    }

    pub(crate) fn subscribe(&self) -> (ConnectionId, broadcast::Receiver<Envelope>) {
        let id = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        (id, self.sender.subscribe())
    }

    pub async fn serve(self, mut socket: WebSocket) {
        let (id, mut receiver) = self.subscribe();
        info!(
            connection = id.0,
            connections = self.connections(),
            "Event socket connected"
        );

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        debug!(connection = id.0, text = text.as_str(), "Relaying client announcement");
                        self.send(Envelope { origin: Some(id), text });
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(connection = id.0, error = %err, "Event socket failed");
                        break;
                    }
                },
                outgoing = receiver.recv() => match outgoing {
                    Ok(envelope) if envelope.is_for(id) => {
                        if socket.send(Message::Text(envelope.text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(connection = id.0, skipped, "Event socket fell behind");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        info!(connection = id.0, "Event socket disconnected");
    }
}
