//! The application-facing server.
//!
//! # Graceful shutdown and supervisors
//!
//! [`Server::on_start`] and [`Server::on_stop`] are meant to be wired into a
//! process supervisor's start and stop hooks. `on_start` never blocks.
//! `on_stop` stops accepting connections at once, lets in-flight requests
//! finish, and gives up when the supervisor's deadline passes.
//!
//! Binaries without a supervisor can call [`Server::serve_until_signal`],
//! which reacts to **SIGTERM** (sent by Kubernetes on pod termination) and
//! Ctrl-C.
//!
//! # Failing to bind is fatal
//!
//! If the listening socket cannot be bound, the error is logged and the
//! process exits with status 1. The same happens if the listener breaks
//! while serving; running out of file descriptors only slows accepting down.
//! Nothing retries a bind: a port that is taken or an address that does not
//! exist will not fix itself, and the supervisor decides about restarts.

use std::net::SocketAddr;
use std::time::Duration;

use http::Method;
use tokio::time::Instant;
use tracing::{Dispatch, info};

use crate::adapter::{to_engine_handler, to_engine_middlewares};
use crate::config::Config;
use crate::engine::{Engine, middleware};
use crate::error::ServerError;
use crate::handler::{Handler, MiddlewareFunc};
use crate::lifecycle::{Lifecycle, State};

/// An HTTP server: configuration, a logger, and the engine that serves.
///
/// Every request is logged (URI and final status) through the logger given
/// to [`Server::new`], and a panic in any handler is answered with
/// `500 Internal Server Error` instead of taking the server down. Both hooks
/// run outside all application middleware.
///
/// ```rust,no_run
/// use waypost::{Config, Context, Error, Response, Server};
///
/// # async fn run() -> Result<(), waypost::ServerError> {
/// let server = Server::new(Config::new(":3000", ""), tracing::Dispatch::none());
/// server.get("/users/{id}", get_user, []);
/// server.on_start()?;
/// # Ok(())
/// # }
///
/// async fn get_user(ctx: Context) -> Result<Response, Error> {
///     let id = ctx.param("id").unwrap_or("unknown");
///     Ok(Response::json(format!(r#"{{"id":"{id}"}}"#)))
/// }
/// ```
pub struct Server {
    config: Config,
    logger: Dispatch,
    engine: Engine,
    lifecycle: Lifecycle,
}

impl Server {
    /// Builds a server and installs the request logger and panic recovery.
    ///
    /// `logger` receives every event the server emits; no global subscriber
    /// is consulted.
    pub fn new(config: Config, logger: impl Into<Dispatch>) -> Self {
        let logger = logger.into();
        let engine = Engine::new();

        let request_log = logger.clone();
        // Installed as the first `pre` middleware so they also cover
        // application `pre` middleware and requests that match no route.
        engine.pre([
            middleware::request_logger(move |v| {
                tracing::dispatcher::with_default(&request_log, || {
                    info!(uri = %v.uri, status = v.status.as_u16(), "request");
                });
            }),
            middleware::recover(),
        ]);

        Self { config, logger, engine, lifecycle: Lifecycle::new() }
    }

    pub fn config(&self) -> &Config { &self.config }

    /// The underlying engine, for what this API does not cover.
    pub fn engine(&self) -> &Engine { &self.engine }

    pub fn state(&self) -> State { self.lifecycle.state() }

    /// The bound address once the server is running.
    pub fn listener_addr(&self) -> Option<SocketAddr> { self.lifecycle.local_addr() }

    // ── Registration ─────────────────────────────────────────────────────────

    pub fn get(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.add(Method::GET, path, handler, middleware);
    }

    pub fn post(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.add(Method::POST, path, handler, middleware);
    }

    pub fn put(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.add(Method::PUT, path, handler, middleware);
    }

    pub fn delete(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.add(Method::DELETE, path, handler, middleware);
    }

    pub fn patch(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.add(Method::PATCH, path, handler, middleware);
    }

    pub fn head(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.add(Method::HEAD, path, handler, middleware);
    }

    pub fn options(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.add(Method::OPTIONS, path, handler, middleware);
    }

    /// Registers `handler` for `method` + `path`.
    ///
    /// `middleware` wraps only this route, inside any global middleware;
    /// the first entry is outermost. Path parameters use `{name}` syntax.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern or is already registered for
    /// `method`.
    pub fn add(
        &self,
        method: Method,
        path: &str,
        handler: impl Handler,
        middleware: impl IntoIterator<Item = MiddlewareFunc>,
    ) {
        self.engine.add(
            method,
            path,
            to_engine_handler(handler.into_handler_func()),
            &to_engine_middlewares(middleware),
        );
    }

    /// Registers `handler` for `path` under every method that has no more
    /// specific route there.
    pub fn any(&self, path: &str, handler: impl Handler, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.engine.any(
            path,
            to_engine_handler(handler.into_handler_func()),
            &to_engine_middlewares(middleware),
        );
    }

    /// Adds middleware around every route, after the route is chosen.
    pub fn use_middleware(&self, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.engine.use_middleware(to_engine_middlewares(middleware));
    }

    /// Adds middleware that runs before routing. It may rewrite the path or
    /// method and so change which route is chosen.
    pub fn pre(&self, middleware: impl IntoIterator<Item = MiddlewareFunc>) {
        self.engine.pre(to_engine_middlewares(middleware));
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Starts serving in the background and returns immediately.
    ///
    /// Fails if no tokio runtime is running, or if the server was already
    /// started or stopped. A bind failure ends the process.
    pub fn on_start(&self) -> Result<(), ServerError> {
        self.lifecycle
            .start(self.engine.clone(), self.config.bind_addr(), self.logger.clone())
            .map_err(|e| e.context("Server::on_start"))
    }

    /// Stops accepting connections and waits for in-flight requests until
    /// `deadline`.
    ///
    /// A deadline that already passed returns at once. Errors are wrapped
    /// with the operation name; the server keeps draining in the background.
    pub async fn on_stop(&self, deadline: Instant) -> Result<(), ServerError> {
        self.lifecycle.stop(deadline).await.map_err(|e| e.context("Server::on_stop"))
    }

    /// Starts, waits for SIGTERM or Ctrl-C, then stops with `grace` to drain.
    pub async fn serve_until_signal(&self, grace: Duration) -> Result<(), ServerError> {
        self.on_start()?;
        shutdown_signal().await;
        tracing::dispatcher::with_default(&self.logger, || {
            info!(grace_ms = grace.as_millis() as u64, "shutdown signal received");
        });
        self.on_stop(Instant::now() + grace).await
    }
}

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// Windows only Ctrl-C is available. If a handler cannot be installed that
/// arm never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
