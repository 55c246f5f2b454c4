//! Built-in health-check handlers.
//!
//! | Probe | Question |
//! |---|---|
//! | **Liveness** | Is the process alive? Failure → restart. |
//! | **Readiness** | Can it serve traffic? Failure → pulled from the load balancer. |
//!
//! ```rust,no_run
//! use waypost::{Config, Server, health};
//!
//! let server = Server::new(Config::new(":3000", ""), tracing::Dispatch::none());
//! server.get("/healthz", health::liveness, []);
//! server.get("/readyz", health::readiness, []);
//! ```
//!
//! Register your own readiness handler instead if traffic should wait on
//! dependencies (database connections, downstream services).

use crate::{Context, Error, Response};

/// Always `200 OK` with body `"ok"`. If the process answers HTTP at all, it is
/// alive.
pub async fn liveness(_ctx: Context) -> Result<Response, Error> {
    Ok(Response::text("ok"))
}

/// `200 OK` with body `"ready"`.
pub async fn readiness(_ctx: Context) -> Result<Response, Error> {
    Ok(Response::text("ready"))
}
