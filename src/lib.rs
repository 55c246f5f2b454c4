//! # waypost
//!
//! A thin routing and middleware layer in front of a hyper-based dispatch
//! engine, with a start/stop lifecycle built for process supervisors.
//!
//! Application code speaks a small vocabulary: a [`Context`] per request, a
//! [`HandlerFunc`] that answers it, and a [`MiddlewareFunc`] that wraps one
//! handler into another. None of the engine's own types appear in that
//! vocabulary; [`Server`] adapts everything on registration. The engine is
//! still reachable through [`Server::engine`] for what the vocabulary does
//! not cover.
//!
//! What the server adds on its own:
//!
//! - one structured log event per request (`uri`, `status`) through the
//!   logger passed to [`Server::new`]
//! - panic recovery: a panicking handler costs one `500`, not the process
//! - `on_start` (non-blocking) and `on_stop` (bounded drain) hooks
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use waypost::{Config, Context, Error, HandlerFunc, MiddlewareFunc, Response, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waypost::ServerError> {
//!     let logger = tracing_subscriber::fmt().finish();
//!     let server = Server::new(Config::new(":3000", ""), logger);
//!
//!     server.get("/users/{id}", get_user, []);
//!     server.post("/users", create_user, [require_json()]);
//!
//!     server.serve_until_signal(Duration::from_secs(30)).await
//! }
//!
//! async fn get_user(ctx: Context) -> Result<Response, Error> {
//!     let id = ctx.param("id").unwrap_or("unknown");
//!     Ok(Response::json(format!(r#"{{"id":"{id}"}}"#)))
//! }
//!
//! async fn create_user(ctx: Context) -> Result<Response, Error> {
//!     if ctx.body().is_empty() {
//!         return Err(Error::bad_request("empty body"));
//!     }
//!     Ok(Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(ctx.body().clone()))
//! }
//!
//! fn require_json() -> MiddlewareFunc {
//!     MiddlewareFunc::new(|next: HandlerFunc| {
//!         HandlerFunc::new(move |ctx: Context| {
//!             let next = next.clone();
//!             async move {
//!                 match ctx.header("content-type") {
//!                     Some(ct) if ct.starts_with("application/json") => next.call(ctx).await,
//!                     _ => Ok(Response::status(StatusCode::UNSUPPORTED_MEDIA_TYPE)),
//!                 }
//!             }
//!         })
//!     })
//! }
//! ```

mod adapter;
mod config;
mod context;
mod error;
mod handler;
mod lifecycle;
mod response;
mod server;

pub mod engine;
pub mod health;

pub use config::Config;
pub use context::Context;
pub use error::{BoxError, ConfigError, Error, ServerError};
pub use handler::{Handler, HandlerFunc, MiddlewareFunc};
pub use http::{Method, StatusCode};
pub use lifecycle::State;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use server::Server;
