//! Echo server: every line a client sends comes straight back.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! Then point a client at 127.0.0.1:7070 with a `Chan<String>`.

use netchan::transport::bind_tcp;
use netchan::{listen, Chan, ChanConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = bind_tcp("127.0.0.1:7070").await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    listen(&listener, ChanConfig::default(), |addr, mut chan: Chan<String>| async move {
        eprintln!("Client connected: {addr}");
        while let Some(line) = chan.recv().await {
            if chan.send(line).await.is_err() {
                break;
            }
        }
        if let Some(err) = chan.error() {
            eprintln!("Client {addr} failed: {err}");
        }
        eprintln!("Client disconnected: {addr}");
    })
    .await?;

    Ok(())
}
