use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Bind a TCP listener.
pub async fn bind_tcp(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
    let local = listener.local_addr()?;
    info!(%local, "listening on tcp");
    Ok(listener)
}

/// Connect to a TCP listener.
pub async fn connect_tcp(addr: &str) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;
    // Frames are small and written whole; don't let Nagle hold back a flag.
    stream.set_nodelay(true)?;
    debug!(addr, "connected over tcp");
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_and_connect() {
        let listener = bind_tcp("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let (client, accepted) = tokio::join!(connect_tcp(&addr), listener.accept());
        let client = client.unwrap();
        let (_server, peer) = accepted.unwrap();
        assert_eq!(client.local_addr().unwrap(), peer);
    }

    #[tokio::test]
    async fn connect_refused_reports_address() {
        let listener = bind_tcp("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect_tcp(&addr).await.unwrap_err();
        match err {
            TransportError::Connect { addr: reported, .. } => assert_eq!(reported, addr),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn bind_rejects_garbage_address() {
        let err = bind_tcp("not an address").await.unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
    }
}
