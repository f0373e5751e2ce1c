//! Notification stream for real-time ledger updates.

use deferral_core::{DeferralError, LedgerEvent, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Stream of [`LedgerEvent`]s from a node.
pub struct NotificationStream {
    receiver: mpsc::Receiver<LedgerEvent>,
    _handle: tokio::task::JoinHandle<()>,
}

/// Decode one text frame. Frames that are not ledger events are skipped.
pub(crate) fn parse_frame(text: &str) -> Option<LedgerEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Ignoring unrecognised notification frame: {}", e);
            None
        }
    }
}

impl NotificationStream {
    /// Connect to a node's notification socket.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| DeferralError::Connection {
                message: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(100);

        let handle = tokio::spawn(async move {
            let (_, mut read) = ws_stream.split();

            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let Some(event) = parse_frame(&text) else {
                            continue;
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }

            debug!("Notification stream closed");
        });

        Ok(Self {
            receiver: rx,
            _handle: handle,
        })
    }

    /// Get the next event. `None` once the socket is closed.
    pub async fn next(&mut self) -> Option<LedgerEvent> {
        self.receiver.recv().await
    }

    /// Adapt into a [`futures::Stream`].
    pub fn into_stream(self) -> ReceiverStream<LedgerEvent> {
        ReceiverStream::new(self.receiver)
    }
}
