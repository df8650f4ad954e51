use std::fmt;
use std::io;

use netchan_engine::ChanError;
use netchan_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn chan_error(context: &str, err: ChanError) -> CliError {
    // Display joins both directions with a newline.
    let detail = err.to_string().replace('\n', "; ");
    CliError::new(FAILURE, format!("{context}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_connection_is_a_plain_failure() {
        let err = transport_error(
            "connect failed",
            TransportError::Connect {
                addr: "127.0.0.1:1".to_string(),
                source: io::ErrorKind::ConnectionRefused.into(),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("connect failed: "));
    }

    #[test]
    fn path_errors_are_transport_errors() {
        let err = transport_error(
            "bind failed",
            TransportError::PathTooLong {
                path: "/tmp/x".into(),
                len: 200,
                max: 108,
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
