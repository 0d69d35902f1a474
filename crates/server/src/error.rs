//! Error types for starting and running the HTTP server.

use std::{fmt, io};

/// Errors that can occur while serving.
#[derive(Debug)]
pub struct ServerError {
    kind: ServerErrorKind,
}

#[derive(Debug)]
enum ServerErrorKind {
    /// The configured bind address is not a socket address.
    Bind(String),
    /// I/O error binding the listener or serving connections.
    Io(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ServerErrorKind::Bind(addr) => write!(f, "invalid bind address '{addr}'"),
            ServerErrorKind::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ServerErrorKind::Bind(_) => None,
            ServerErrorKind::Io(e) => Some(e),
        }
    }
}

impl ServerError {
    pub(crate) fn bind(addr: impl Into<String>) -> Self {
        Self { kind: ServerErrorKind::Bind(addr.into()) }
    }

    pub(crate) fn io(err: io::Error) -> Self {
        Self { kind: ServerErrorKind::Io(err) }
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        Self::io(err)
    }
}
