//! Application-facing handler and middleware shapes.
//!
//! ```text
//! async fn hello(ctx: Context) -> Result<Response, Error> { … }  ← user writes this
//!        ↓ server.get("/", hello, [])
//! hello.into_handler_func()                                      ← Handler blanket impl
//!        ↓
//! HandlerFunc(Arc<dyn Fn(Context) -> BoxFuture<…>>)              ← type-erased, shared
//!        ↓ adapter::to_engine_handler
//! engine::HandlerFunc                                            ← stored in the route table
//! ```
//!
//! A [`MiddlewareFunc`] is a function from one [`HandlerFunc`] to another. It
//! may run code before and after calling the handler it wraps, or answer on
//! its own without calling it at all:
//!
//! ```rust
//! use waypost::{Context, HandlerFunc, MiddlewareFunc, Response, StatusCode};
//!
//! let require_token = MiddlewareFunc::new(|next: HandlerFunc| {
//!     HandlerFunc::new(move |ctx: Context| {
//!         let next = next.clone();
//!         async move {
//!             if ctx.header("authorization").is_none() {
//!                 return Ok(Response::status(StatusCode::UNAUTHORIZED));
//!             }
//!             next.call(ctx).await
//!         }
//!     })
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::engine::BoxFuture;
use crate::error::Error;
use crate::response::{IntoResponse, Response};

type DynHandler = dyn Fn(Context) -> BoxFuture<Result<Response, Error>> + Send + Sync;
type DynMiddleware = dyn Fn(HandlerFunc) -> HandlerFunc + Send + Sync;

/// A type-erased request handler. Cheap to clone.
#[derive(Clone)]
pub struct HandlerFunc(Arc<DynHandler>);

impl HandlerFunc {
    /// Wraps an async function or closure.
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
        R: IntoResponse,
    {
        Self(Arc::new(move |ctx: Context| -> BoxFuture<Result<Response, Error>> {
            let fut = f(ctx);
            Box::pin(async move { fut.await.map(IntoResponse::into_response) })
        }))
    }

    /// Wraps a function that already returns a boxed future, without adding
    /// another layer.
    pub(crate) fn from_boxed<F>(f: F) -> Self
    where
        F: Fn(Context) -> BoxFuture<Result<Response, Error>> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, ctx: Context) -> BoxFuture<Result<Response, Error>> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for HandlerFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerFunc")
    }
}

/// A handler decorator. Cheap to clone.
#[derive(Clone)]
pub struct MiddlewareFunc(Arc<DynMiddleware>);

impl MiddlewareFunc {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wraps `next`, returning the decorated handler.
    pub fn apply(&self, next: HandlerFunc) -> HandlerFunc {
        (self.0)(next)
    }
}

impl fmt::Debug for MiddlewareFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MiddlewareFunc")
    }
}

// ── Handler trait ─────────────────────────────────────────────────────────────

/// Anything that can be registered as a route handler.
///
/// Satisfied by every `async fn` (or closure) with the signature
///
/// ```text
/// async fn name(ctx: Context) -> Result<impl IntoResponse, Error>
/// ```
///
/// and by [`HandlerFunc`] itself. The trait is sealed: only the impls below
/// can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_handler_func(self) -> HandlerFunc;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
    R: IntoResponse,
{
    fn into_handler_func(self) -> HandlerFunc {
        HandlerFunc::new(self)
    }
}

impl private::Sealed for HandlerFunc {}

impl Handler for HandlerFunc {
    fn into_handler_func(self) -> HandlerFunc { self }
}
