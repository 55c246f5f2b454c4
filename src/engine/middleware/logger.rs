use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{Method, StatusCode, Uri};

use crate::engine::handler::{HandlerFunc, MiddlewareFunc, handler_fn, middleware_fn};

/// What [`request_logger`] knows about a finished request.
#[derive(Clone, Debug)]
pub struct RequestLoggerValues {
    /// The URI exactly as the client sent it, before any rewriting.
    pub uri: Uri,
    pub method: Method,
    /// The status the client receives. For a failed request this is the
    /// status the engine translates the error into.
    pub status: StatusCode,
    pub latency: Duration,
}

/// Calls `log_values` once for every request that completes, successfully or
/// not.
///
/// The inner result is returned untouched: errors still travel outward to the
/// engine's error translation. `log_values` cannot fail the request.
pub fn request_logger<F>(log_values: F) -> MiddlewareFunc
where
    F: Fn(&RequestLoggerValues) + Send + Sync + 'static,
{
    let log_values = Arc::new(log_values);
    middleware_fn(move |next: HandlerFunc| {
        let log_values = Arc::clone(&log_values);
        handler_fn(move |ctx| {
            let log_values = Arc::clone(&log_values);
            let next = Arc::clone(&next);
            async move {
                let uri = ctx.uri().clone();
                let method = ctx.method().clone();
                let start = Instant::now();

                let result = next(ctx).await;

                let status = match &result {
                    Ok(res) => res.status_code(),
                    Err(err) => err.status(),
                };
                log_values(&RequestLoggerValues { uri, method, status, latency: start.elapsed() });
                result
            }
        })
    })
}
