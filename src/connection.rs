//! Connection channel abstraction
//!
//! The session only needs to push text frames out, pull text frames in and
//! close the socket. `FrameSink`/`FrameSource` capture that, with
//! implementations for the two halves of an axum WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::TransportError;
use crate::message::ServerMessage;

/// Outbound half of a client connection
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one text frame
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a close frame; errors are irrelevant at this point
    async fn close(&mut self);
}

/// Inbound half of a client connection
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Wait for the next text frame
    ///
    /// `None` means the peer closed the connection.
    async fn receive(&mut self) -> Option<Result<String, TransportError>>;
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        SinkExt::send(self, Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = SinkExt::close(self).await;
    }
}

#[async_trait]
impl FrameSource for SplitStream<WebSocket> {
    async fn receive(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(_)) => return None,
                // Ping/pong is answered by the protocol layer; binary is not part of the protocol
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Time a closing connection gets to flush frames that are already queued
pub const FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Spawn the writer task for one connection
///
/// Serialises queued `ServerMessage`s onto the sink. Cancelling `shutdown`
/// interrupts even a send that is stuck on a peer that stopped reading;
/// whatever is still queued then gets `FLUSH_TIMEOUT` to go out before the
/// sink is dropped. The queue is closed on exit so senders observe the
/// closed connection.
pub fn spawn_writer<S: FrameSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<ServerMessage>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = write(&mut sink, &msg) => result,
            };
            if let Err(e) = result {
                debug!("WebSocket send failed, ending write task: {}", e);
                break;
            }
        }

        rx.close();
        let flush = async {
            while let Ok(msg) = rx.try_recv() {
                if write(&mut sink, &msg).await.is_err() {
                    break;
                }
            }
            sink.close().await;
        };
        if tokio::time::timeout(FLUSH_TIMEOUT, flush).await.is_err() {
            debug!("Flush timed out, dropping connection");
        }
        debug!("Write task ended");
    })
}

async fn write<S: FrameSink>(sink: &mut S, msg: &ServerMessage) -> Result<(), TransportError> {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(json).await,
        Err(e) => {
            // Continue - don't break on serialization errors
            error!("Failed to serialize message: {}", e);
            Ok(())
        }
    }
}
