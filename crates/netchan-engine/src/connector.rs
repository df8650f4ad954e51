#[cfg(unix)]
use std::path::Path;

use netchan_transport::{Result, Stream};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::chan::{Chan, ChanConfig};

/// Wrap an already connected stream in a channel.
///
/// Shorthand for [`Chan::new`].
pub fn wrap<T, S>(stream: S, buffer: usize) -> Chan<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    S: Stream,
{
    Chan::new(stream, buffer)
}

/// Connect to a TCP address and open a channel over the connection.
pub async fn connect_tcp<T>(addr: &str, config: ChanConfig) -> Result<Chan<T>>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    let stream = netchan_transport::connect_tcp(addr).await?;
    Ok(Chan::with_config(stream, config))
}

/// Connect to a Unix domain socket and open a channel over the connection.
#[cfg(unix)]
pub async fn connect_unix<T>(path: impl AsRef<Path>, config: ChanConfig) -> Result<Chan<T>>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    let stream = netchan_transport::UnixSocketListener::connect(path).await?;
    Ok(Chan::with_config(stream, config))
}
