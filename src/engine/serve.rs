//! Accept loop and graceful connection draining.
//!
//! When the shutdown future resolves the engine:
//! 1. Stops calling `listener.accept()` and drops the listener, so no new
//!    connections are made.
//! 2. Tells every open connection to finish its in-flight request and close;
//!    idle keep-alive connections close immediately.
//! 3. Returns once every connection task has ended.
//!
//! Bounding how long step 3 may take is the caller's job.
//!
//! Accept errors do not stop the loop unless the listener itself is broken;
//! the rest back off between 5ms and 1s.

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;
use tracing::{error, info, warn};

use crate::engine::{Context, Engine};
use crate::error::Error;
use crate::response::Response;

impl Engine {
    /// Serves connections from `listener` until `shutdown` resolves, then
    /// drains open connections and returns.
    ///
    /// Transient accept errors are retried with a growing delay. An error
    /// that leaves the listener unusable is returned at once, without
    /// draining.
    ///
    /// Connection tasks inherit the subscriber that is current when `serve`
    /// is polled.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        match listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "listening"),
            Err(e) => warn!("listening on unknown address: {e}"),
        }

        let builder = ConnBuilder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during shutdown.
        let mut tasks = JoinSet::new();

        tokio::pin!(shutdown);

        let mut retry_delay: Option<Duration> = None;

        loop {
            let accepted = tokio::select! {
                // Check shutdown first so a stop request immediately ends
                // accepting, even if more connections are queued.
                biased;

                () = &mut shutdown => break,

                res = listener.accept() => res,

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => continue,
            };

            let (stream, remote_addr) = match accepted {
                Ok(v) => {
                    retry_delay = None;
                    v
                }
                Err(e) if is_fatal_accept_error(&e) => return Err(e),
                Err(e) => {
                    // Usually out of file descriptors; accepting again right
                    // away would fail the same way.
                    let delay = next_retry_delay(retry_delay);
                    retry_delay = Some(delay);
                    warn!(retry_in_ms = delay.as_millis() as u64, "accept error: {e}");
                    tokio::select! {
                        biased;
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            let engine = self.clone();
            // Called once per request on the connection, not once
            // per connection.
            let svc = service_fn(move |req| {
                let engine = engine.clone();
                async move { serve_request(engine, req, remote_addr).await }
            });

            // `auto::Builder` handles both HTTP/1.1 and HTTP/2.
            let conn = builder.serve_connection(TokioIo::new(stream), svc).into_owned();
            let conn = graceful.watch(conn);

            tasks.spawn(
                async move {
                    if let Err(e) = conn.await {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                }
                .with_current_subscriber(),
            );
        }

        info!(in_flight = tasks.len(), "shutdown requested, draining connections");
        drop(listener);
        graceful.shutdown().await;
        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

/// Errors after which the listener itself is unusable. Anything else (file
/// descriptor exhaustion, aborted handshakes) is retried.
fn is_fatal_accept_error(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotConnected | io::ErrorKind::InvalidInput)
}

const MIN_RETRY_DELAY: Duration = Duration::from_millis(5);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Doubles from 5ms up to 1s while accept keeps failing.
fn next_retry_delay(previous: Option<Duration>) -> Duration {
    match previous {
        None => MIN_RETRY_DELAY,
        Some(d) => (d * 2).min(MAX_RETRY_DELAY),
    }
}

/// Buffers one request body and runs the request through the engine.
///
/// The error type is [`Infallible`]: every failure becomes a response here,
/// so hyper never sees an error.
async fn serve_request(
    engine: Engine,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            let err = Error::bad_request("unreadable request body");
            return Ok(Response::from_error(&err).into_inner());
        }
    };

    let ctx = Context::from_request(http::Request::from_parts(parts, body), Some(remote_addr));
    Ok(engine.dispatch(ctx).await.into_inner())
}
