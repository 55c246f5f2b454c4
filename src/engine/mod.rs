//! The dispatch engine.
//!
//! The engine owns the route table and the two global middleware stacks, and
//! runs the accept loop. It knows nothing about the application-facing
//! [`HandlerFunc`](crate::HandlerFunc) shape; everything reaching it has
//! already been adapted to the native shapes in [`handler`].
//!
//! Per request:
//!
//! ```text
//! pre middleware ─▶ routing ─▶ use middleware ─▶ route middleware ─▶ handler
//! ```
//!
//! `pre` middleware runs before a route is chosen and may rewrite the method
//! or path. `use` middleware runs after, so it also wraps the not-found and
//! method-not-allowed handlers. A handler error comes back out through every
//! layer and is translated into a response last. A panic anywhere in the
//! chain, `pre` middleware included, is answered with `500`.

mod context;
pub mod handler;
pub mod middleware;
mod router;
mod serve;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use http::Method;
use tracing::debug;

pub use context::Context;
pub use handler::{BoxFuture, HandlerFunc, MiddlewareFunc, apply_middleware, handler_fn, middleware_fn};

use crate::error::Error;
use crate::response::Response;
use router::{Route, Router};

/// The engine handle. Cheap to clone; clones share one route table.
///
/// Registration may happen before or while serving. Routes are only ever
/// added.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    router: RwLock<Router>,
    pre: RwLock<Vec<MiddlewareFunc>>,
    middleware: RwLock<Vec<MiddlewareFunc>>,
    not_found: HandlerFunc,
    method_not_allowed: HandlerFunc,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                router: RwLock::default(),
                pre: RwLock::default(),
                middleware: RwLock::default(),
                not_found: handler_fn(|_ctx| async { Err(Error::not_found()) }),
                method_not_allowed: handler_fn(|_ctx| async { Err(Error::method_not_allowed()) }),
            }),
        }
    }

    /// Registers `handler` for `method` + `path`, wrapped in `middleware`
    /// (first entry outermost).
    ///
    /// # Panics
    ///
    /// Panics if `path` is invalid or already registered for `method`.
    pub fn add(&self, method: Method, path: &str, handler: HandlerFunc, middleware: &[MiddlewareFunc]) {
        let handler = apply_middleware(handler, middleware);
        write(&self.inner.router).insert(method, path, handler);
    }

    /// Like [`add`](Engine::add), for every method without a more specific
    /// route on `path`.
    pub fn any(&self, path: &str, handler: HandlerFunc, middleware: &[MiddlewareFunc]) {
        let handler = apply_middleware(handler, middleware);
        write(&self.inner.router).insert_any(path, handler);
    }

    /// Appends middleware that runs after routing, around every handler.
    pub fn use_middleware(&self, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        write(&self.inner.middleware).extend(middleware);
    }

    /// Appends middleware that runs before routing.
    pub fn pre(&self, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        write(&self.inner.pre).extend(middleware);
    }

    /// Dispatches one buffered request in-process, without a socket.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        self.dispatch(Context::from_request(req, None)).await
    }

    pub(crate) async fn dispatch(&self, ctx: Context) -> Response {
        let pre = read(&self.inner.pre).clone();
        let chain = middleware::recover()(apply_middleware(self.routing_handler(), &pre));

        match chain(ctx).await {
            Ok(res) => res,
            Err(err) => {
                debug!(status = err.status().as_u16(), error = %err, "request failed");
                Response::from_error(&err)
            }
        }
    }

    /// The innermost `pre` handler: picks a route for the (possibly
    /// rewritten) method and path, then runs it under `use` middleware.
    fn routing_handler(&self) -> HandlerFunc {
        let engine = self.clone();
        Arc::new(move |mut ctx: Context| -> BoxFuture<Result<Response, Error>> {
            let handler = engine.find(&mut ctx);
            handler(ctx)
        })
    }

    fn find(&self, ctx: &mut Context) -> HandlerFunc {
        let route = read(&self.inner.router).lookup(ctx.method(), ctx.path());
        let handler = match route {
            Route::Found(handler, params) => {
                ctx.set_params(params);
                handler
            }
            Route::MethodNotAllowed => Arc::clone(&self.inner.method_not_allowed),
            Route::NotFound => Arc::clone(&self.inner.not_found),
        };
        let middleware = read(&self.inner.middleware).clone();
        apply_middleware(handler, &middleware)
    }
}

impl Default for Engine {
    fn default() -> Self { Self::new() }
}

// Registration never leaves a table half-written, so a poisoned lock still
// guards consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
