//! Built-in engine middleware.
//!
//! - [`request_logger`] — reports URI, method, status and latency of every
//!   request to a callback.
//! - [`recover`] — turns a panic anywhere downstream into an error response.

mod logger;
mod recover;

pub use logger::{RequestLoggerValues, request_logger};
pub use recover::recover;
