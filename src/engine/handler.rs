//! Native handler and middleware shapes.
//!
//! The route table needs handlers of many concrete types in one map, so every
//! handler is erased to an `Arc<dyn Fn>` returning a boxed future. The only
//! runtime cost per call is one virtual call and one boxed future.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::Context;
use crate::error::Error;
use crate::response::Response;

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` so tokio can move it between worker threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// An engine handler: native context in, response or error out.
pub type HandlerFunc = Arc<dyn Fn(Context) -> BoxFuture<Result<Response, Error>> + Send + Sync>;

/// An engine middleware: wraps a handler into a new handler.
pub type MiddlewareFunc = Arc<dyn Fn(HandlerFunc) -> HandlerFunc + Send + Sync>;

/// Erases an async function into a [`HandlerFunc`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFunc
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    Arc::new(move |ctx: Context| -> BoxFuture<Result<Response, Error>> { Box::pin(f(ctx)) })
}

/// Erases a handler-to-handler function into a [`MiddlewareFunc`].
pub fn middleware_fn<F>(f: F) -> MiddlewareFunc
where
    F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps `handler` in `middleware` so the first entry is outermost.
pub fn apply_middleware(mut handler: HandlerFunc, middleware: &[MiddlewareFunc]) -> HandlerFunc {
    for mw in middleware.iter().rev() {
        handler = mw(handler);
    }
    handler
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::StatusCode;

    use super::*;

    fn tracing_mw(log: Arc<Mutex<Vec<String>>>, name: &'static str) -> MiddlewareFunc {
        middleware_fn(move |next| {
            let log = Arc::clone(&log);
            handler_fn(move |ctx| {
                let log = Arc::clone(&log);
                let next = Arc::clone(&next);
                async move {
                    log.lock().unwrap().push(format!("{name} in"));
                    let res = next(ctx).await;
                    log.lock().unwrap().push(format!("{name} out"));
                    res
                }
            })
        })
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = Arc::clone(&log);
        let handler = handler_fn(move |_ctx| {
            let log = Arc::clone(&inner_log);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                Ok(Response::status(StatusCode::OK))
            }
        });

        let chain = apply_middleware(
            handler,
            &[tracing_mw(Arc::clone(&log), "a"), tracing_mw(Arc::clone(&log), "b")],
        );
        let req = http::Request::new(bytes::Bytes::new());
        chain(Context::from_request(req, None)).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["a in", "b in", "handler", "b out", "a out"]
        );
    }
}
