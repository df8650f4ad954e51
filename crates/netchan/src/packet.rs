//! Chat protocol packets and a send/receive split for them.

use netchan_engine::{Chan, ChanConfig, ChanError, SendError};
use netchan_transport::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Queue capacity used for packet channels.
pub const MAX_QUEUED_PACKETS: usize = 16;

/// Everything a chat client and server say to each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    /// Sent periodically by idle clients, echoed by the server.
    KeepAlive,
    /// A line of chat text.
    Message { text: String },
    /// The sender is leaving. The server echoes it back before closing.
    Quit,
}

/// Channel configuration for packet channels.
pub fn packet_config() -> ChanConfig {
    ChanConfig::default().with_buffer(MAX_QUEUED_PACKETS)
}

/// Open a packet channel over `stream`.
pub fn packet_chan<S: Stream>(stream: S) -> Chan<Packet> {
    Chan::with_config(stream, packet_config())
}

/// Split a packet channel into halves that can live in different tasks.
///
/// The channel's own sending side is closed, so the peer sees the
/// termination flag once every clone of the returned sender is dropped.
pub fn split(mut chan: Chan<Packet>) -> (PacketSender, PacketReceiver) {
    let tx = chan.sender().cloned();
    chan.close();
    (PacketSender { tx }, PacketReceiver { chan })
}

/// Sending half of a split packet channel.
#[derive(Debug, Clone)]
pub struct PacketSender {
    tx: Option<mpsc::Sender<Packet>>,
}

impl PacketSender {
    /// Queue a packet, waiting for room.
    pub async fn send(&self, packet: Packet) -> Result<(), SendError<Packet>> {
        match &self.tx {
            Some(tx) => tx.send(packet).await.map_err(|err| SendError::Stopped(err.0)),
            None => Err(SendError::Closed(packet)),
        }
    }

    /// Queue a packet only if there is room right now.
    pub fn try_send(&self, packet: Packet) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.try_send(packet).is_ok())
    }

    pub async fn message(&self, text: impl Into<String>) -> Result<(), SendError<Packet>> {
        self.send(Packet::Message { text: text.into() }).await
    }

    pub async fn keep_alive(&self) -> Result<(), SendError<Packet>> {
        self.send(Packet::KeepAlive).await
    }

    pub async fn quit(&self) -> Result<(), SendError<Packet>> {
        self.send(Packet::Quit).await
    }
}

/// Receiving half of a split packet channel.
#[derive(Debug)]
pub struct PacketReceiver {
    chan: Chan<Packet>,
}

impl PacketReceiver {
    /// Next packet from the peer, `None` once the channel has ended.
    pub async fn recv(&mut self) -> Option<Packet> {
        self.chan.recv().await
    }

    /// Every fatal error the channel has seen.
    pub fn error(&self) -> Option<ChanError> {
        self.chan.error()
    }

    /// Stop receiving and wait for queued packets to go out.
    pub async fn shutdown(&mut self) {
        self.chan.shutdown().await;
    }
}
