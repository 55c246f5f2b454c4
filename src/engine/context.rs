//! The engine's native per-request context.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};

/// One in-flight request as the engine sees it.
///
/// `path` starts out as the request URI's path and is what the router
/// matches on; pre-routing middleware may rewrite it (and the method) before
/// a route is chosen. `uri` always keeps the URI the client sent.
#[derive(Debug)]
pub struct Context {
    method: Method,
    uri: Uri,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    extensions: Extensions,
    remote_addr: Option<SocketAddr>,
}

impl Context {
    /// Builds a context from a fully-buffered request.
    pub fn from_request(req: http::Request<Bytes>, remote_addr: Option<SocketAddr>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            path: parts.uri.path().to_owned(),
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            extensions: parts.extensions,
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn set_method(&mut self, method: Method) { self.method = method; }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { &self.path }
    pub fn set_path(&mut self, path: impl Into<String>) { self.path = path.into(); }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}
