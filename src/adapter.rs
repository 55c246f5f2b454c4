//! Conversion between application-facing and engine-native function shapes.
//!
//! Each conversion only re-wraps the context on the way in. The future the
//! wrapped function returns is handed back as-is: no extra future, no
//! buffering, no mapping of the result. An error out of application code is
//! the exact value the engine receives.

use std::sync::Arc;

use crate::context::Context;
use crate::engine;
use crate::handler::{HandlerFunc, MiddlewareFunc};

/// Application handler → engine handler.
pub(crate) fn to_engine_handler(handler: HandlerFunc) -> engine::HandlerFunc {
    Arc::new(move |ctx: engine::Context| handler.call(Context::from_engine(ctx)))
}

/// Engine handler → application handler. Inverse of [`to_engine_handler`].
pub(crate) fn from_engine_handler(next: engine::HandlerFunc) -> HandlerFunc {
    HandlerFunc::from_boxed(move |ctx: Context| next(ctx.into_engine()))
}

/// Application middleware → engine middleware.
///
/// The engine's `next` is lifted into a [`HandlerFunc`], decorated by the
/// application middleware, and the result lowered back.
pub(crate) fn to_engine_middleware(middleware: MiddlewareFunc) -> engine::MiddlewareFunc {
    Arc::new(move |next: engine::HandlerFunc| {
        to_engine_handler(middleware.apply(from_engine_handler(next)))
    })
}

pub(crate) fn to_engine_middlewares(
    middleware: impl IntoIterator<Item = MiddlewareFunc>,
) -> Vec<engine::MiddlewareFunc> {
    middleware.into_iter().map(to_engine_middleware).collect()
}
