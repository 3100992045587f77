//! WebSocket transport.
//!
//! Each transport is a spawned task that connects, reports what happens as
//! [`TransportSignal`]s tagged with its [`TransportId`], and forwards text
//! frames both ways. This is a thin layer that only moves text; protocol
//! logic remains in the Sans-IO [`Client`](crate::Client).

use futures::{SinkExt, StreamExt};
use meadow_core::TransportId;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport task has ended.
    #[error("transport {0} is closed")]
    Closed(TransportId),
}

/// What a transport reports back to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// Handshake completed.
    Opened,
    /// Text frame received.
    Message(String),
    /// Connection failed or broke.
    Error(String),
    /// Connection ended. Always the last signal.
    Closed {
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// Sender half shared by every transport.
pub type SignalSender = mpsc::UnboundedSender<(TransportId, TransportSignal)>;

/// Handle to a running transport task.
pub struct TransportHandle {
    id: TransportId,
    outbound: mpsc::UnboundedSender<String>,
    abort_handle: tokio::task::AbortHandle,
}

impl TransportHandle {
    /// Queue a text frame.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.outbound.send(text).map_err(|_| TransportError::Closed(self.id))
    }

    /// Stop the transport. No further signals are guaranteed.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to `endpoint` in a new task.
///
/// Signals for this transport arrive on `signals` tagged with `id`.
pub fn spawn(id: TransportId, endpoint: String, signals: SignalSender) -> TransportHandle {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_transport(id, endpoint, outbound_rx, signals));

    TransportHandle { id, outbound: outbound_tx, abort_handle: task.abort_handle() }
}

async fn run_transport(
    id: TransportId,
    endpoint: String,
    mut outbound: mpsc::UnboundedReceiver<String>,
    signals: SignalSender,
) {
    let signal = |s: TransportSignal| {
        // Receiver gone means the runtime stopped; nothing left to tell.
        let _ = signals.send((id, s));
    };

    let (stream, _) = match connect_async(endpoint.as_str()).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::debug!(transport_id = %id, endpoint = %endpoint, error = %e, "connect failed");
            signal(TransportSignal::Error(format!("connect failed: {e}")));
            signal(TransportSignal::Closed { reason: e.to_string() });
            return;
        },
    };
    signal(TransportSignal::Opened);

    let (mut write, mut read) = stream.split();
    let reason = loop {
        tokio::select! {
            Some(text) = outbound.recv() => {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    signal(TransportSignal::Error(format!("send failed: {e}")));
                    break e.to_string();
                }
            }

            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    signal(TransportSignal::Message(text.as_str().to_owned()));
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.as_str().to_owned()).unwrap_or_default();
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    signal(TransportSignal::Error(e.to_string()));
                    break e.to_string();
                },
                None => break "stream ended".to_string(),
            },
        }
    };

    tracing::debug!(transport_id = %id, reason = %reason, "transport closed");
    signal(TransportSignal::Closed { reason });
}
