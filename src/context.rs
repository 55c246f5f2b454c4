//! The request context handed to application handlers.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::engine;

/// One in-flight request.
///
/// A thin wrapper over the engine's own context: it exposes only what
/// handlers and middleware need, so application code never names an engine
/// type.
#[derive(Debug)]
pub struct Context {
    inner: engine::Context,
}

impl Context {
    pub(crate) fn from_engine(inner: engine::Context) -> Self {
        Self { inner }
    }

    pub(crate) fn into_engine(self) -> engine::Context {
        self.inner
    }

    pub fn method(&self) -> &Method { self.inner.method() }

    /// The URI the client sent. Unaffected by [`set_path`](Context::set_path).
    pub fn uri(&self) -> &Uri { self.inner.uri() }

    /// The path used for routing.
    pub fn path(&self) -> &str { self.inner.path() }

    /// Named path parameter. For a route `/users/{id}`, `param("id")` on
    /// `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> { self.inner.param(name) }

    pub fn query_string(&self) -> Option<&str> { self.inner.uri().query() }

    /// Case-insensitive header lookup. `None` if absent or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap { self.inner.headers() }
    pub fn body(&self) -> &Bytes { self.inner.body() }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.inner.remote_addr() }

    /// Rewrites the routing path. Only meaningful in middleware registered
    /// with [`Server::pre`](crate::Server::pre); after routing the route is
    /// already chosen.
    pub fn set_path(&mut self, path: impl Into<String>) { self.inner.set_path(path); }

    /// Rewrites the routing method. Same caveat as [`set_path`](Context::set_path).
    pub fn set_method(&mut self, method: Method) { self.inner.set_method(method); }

    /// Stores a value for middleware or handlers further down the chain.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.inner.extensions_mut().insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.extensions().get::<T>()
    }
}
