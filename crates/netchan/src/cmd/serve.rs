use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use netchan::packet::{packet_config, split, Packet, PacketSender};
use netchan_engine::{listen, Chan};
use netchan_transport::bind_tcp;
use tracing::{debug, info, warn};

use crate::cmd::ServeArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};

pub async fn run(args: ServeArgs) -> CliResult<i32> {
    let listener = bind_tcp(&args.addr)
        .await
        .map_err(|err| transport_error("bind failed", err))?;
    let hub = Hub::default();

    tokio::select! {
        result = listen(&listener, packet_config(), move |addr, chan| {
            serve_client(hub.clone(), addr, chan)
        }) => {
            result.map_err(|err| transport_error("accept failed", err))?;
            Ok(SUCCESS)
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(SUCCESS)
        }
    }
}

async fn serve_client(hub: Hub, addr: SocketAddr, chan: Chan<Packet>) {
    let (tx, mut rx) = split(chan);
    let id = hub.join(tx.clone());
    info!(%addr, "client connected");

    while let Some(packet) = rx.recv().await {
        debug!(%addr, ?packet, "packet received");
        match packet {
            Packet::Message { text } => hub.broadcast(Packet::Message {
                text: format!("{addr}: {text}"),
            }),
            other => {
                if tx.send(other).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.leave(id);
    drop(tx);
    rx.shutdown().await;
    if let Some(err) = rx.error() {
        warn!(%addr, error = %err, "client channel failed");
    }
    info!(%addr, "client disconnected");
}

/// Senders of every connected client.
#[derive(Clone, Default)]
struct Hub {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    clients: HashMap<u64, PacketSender>,
}

impl Hub {
    fn join(&self, sender: PacketSender) -> u64 {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = state.next_id;
        state.next_id += 1;
        state.clients.insert(id, sender);
        id
    }

    fn leave(&self, id: u64) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.clients.remove(&id);
    }

    /// Offer `packet` to every client. Clients whose queue is full miss it.
    fn broadcast(&self, packet: Packet) {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for (id, client) in &state.clients {
            if !client.try_send(packet.clone()) {
                debug!(client = id, "client queue full, message skipped");
            }
        }
    }
}
