//! Error types.
//!
//! Three kinds of failure, three policies:
//!
//! - [`Error`] — a handler or middleware failed. Forwarded unchanged through
//!   every layer and turned into an HTTP response by the engine.
//! - [`ServerError`] — a lifecycle operation failed. Shutdown errors are
//!   wrapped with the name of the failing operation and handed back.
//! - [`ConfigError`] — configuration could not be loaded.
//!
//! Bind failures at startup and unrecoverable listener failures while
//! serving never reach the caller: they are logged and the process exits.

use std::io;

use http::StatusCode;
use thiserror::Error;

/// A boxed error from application code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a handler or middleware.
///
/// Returning `Err` from a handler is a normal outcome, not a crash. The engine
/// translates it into a response: [`Error::Http`] keeps its status, anything
/// else becomes `500 Internal Server Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// An error that maps to a specific HTTP status.
    #[error("{status}: {message}")]
    Http { status: StatusCode, message: String },

    /// A handler or middleware panicked and the panic was caught.
    #[error("panic: {0}")]
    Panic(String),

    /// Any other application failure.
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl Error {
    /// An error answered with `status` and a message.
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http { status, message: message.into() }
    }

    /// An error answered with `status` and its canonical reason phrase.
    pub fn status_only(status: StatusCode) -> Self {
        Self::http(status, status.canonical_reason().unwrap_or_default())
    }

    pub fn not_found() -> Self {
        Self::status_only(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::status_only(StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    /// Wraps an arbitrary application error.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    /// The status the engine answers this error with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http { status, .. } => *status,
            Self::Panic(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message safe to show a client. Internal failures only expose the
    /// reason phrase.
    pub(crate) fn public_message(&self) -> &str {
        match self {
            Self::Http { message, .. } => message,
            Self::Panic(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .unwrap_or_default(),
        }
    }
}

/// Failure of a lifecycle operation.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The operation is not valid in the server's current state.
    #[error("cannot {op} a server that is {state}")]
    InvalidState { op: &'static str, state: &'static str },

    /// The configured address could not be bound.
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The listener failed in a way retrying cannot fix.
    #[error("accept: {0}")]
    Accept(#[source] io::Error),

    /// `on_start` was called outside a tokio runtime.
    #[error("no tokio runtime is running")]
    NoRuntime,

    /// The shutdown deadline elapsed before in-flight requests drained.
    #[error("shutdown deadline exceeded")]
    DeadlineExceeded,

    /// `source` annotated with the operation that produced it.
    #[error("{op}: {source}")]
    Op {
        op: &'static str,
        #[source]
        source: Box<ServerError>,
    },
}

impl ServerError {
    /// Wraps `self` with the name of the failing operation.
    pub fn context(self, op: &'static str) -> Self {
        Self::Op { op, source: Box::new(self) }
    }

    /// The innermost error, with every [`ServerError::Op`] layer removed.
    pub fn root(&self) -> &ServerError {
        match self {
            Self::Op { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Failure to load a [`Config`](crate::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("setting `{name}` must not be empty")]
    Empty { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_variant() {
        assert_eq!(Error::not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Panic("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::other("db down").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_errors_hide_their_message() {
        let err = Error::other("connection string leaked");
        assert_eq!(err.public_message(), "Internal Server Error");
        assert_eq!(Error::bad_request("missing id").public_message(), "missing id");
    }

    #[test]
    fn context_wraps_and_root_unwraps() {
        let err = ServerError::DeadlineExceeded.context("Server::on_stop");
        assert_eq!(err.to_string(), "Server::on_stop: shutdown deadline exceeded");
        assert!(matches!(err.root(), ServerError::DeadlineExceeded));
        assert!(std::error::Error::source(&err).is_some());
    }
}
