use std::future::Future;
use std::time::Duration;

use netchan_transport::{is_resource_exhaustion, is_transient_accept_error, Acceptor, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::chan::{Chan, ChanConfig};

/// Pause before accepting again after running out of descriptors.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections forever, wrapping each in a channel.
///
/// Every accepted stream becomes a [`Chan`] built from `config`, and
/// `on_connect` runs for it in its own task. Errors that only affect one
/// connection attempt are logged and skipped. Any other accept error ends
/// the loop and is returned.
pub async fn listen<A, T, F, Fut>(
    acceptor: &A,
    config: ChanConfig,
    mut on_connect: F,
) -> Result<(), TransportError>
where
    A: Acceptor,
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnMut(A::Addr, Chan<T>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        match acceptor.accept().await {
            Ok((stream, addr)) => {
                debug!(?addr, "accepted connection");
                let chan = Chan::with_config(stream, config.clone());
                tokio::spawn(on_connect(addr, chan));
            }
            Err(err) if is_transient_accept_error(&err) => {
                warn!(error = %err, "accept failed, continuing");
                if is_resource_exhaustion(&err) {
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
            Err(err) => return Err(TransportError::Accept(err)),
        }
    }
}
