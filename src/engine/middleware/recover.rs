use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::error;

use crate::engine::handler::{HandlerFunc, MiddlewareFunc, handler_fn, middleware_fn};
use crate::error::Error;

/// Converts a panic in any downstream handler or middleware into
/// [`Error::Panic`].
///
/// Both the call that builds the inner future and every poll of it are
/// covered. Only the panicking request is affected.
pub fn recover() -> MiddlewareFunc {
    middleware_fn(|next: HandlerFunc| {
        handler_fn(move |ctx| {
            let next = Arc::clone(&next);
            let path = ctx.path().to_owned();
            AssertUnwindSafe(async move { next(ctx).await })
                .catch_unwind()
                .map(move |outcome| {
                    outcome.unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        error!(path = %path, panic = %message, "handler panicked");
                        Err(Error::Panic(message))
                    })
                })
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::engine::Context;
    use crate::engine::handler::BoxFuture;
    use crate::response::Response;

    fn ctx() -> Context {
        Context::from_request(http::Request::new(Bytes::new()), None)
    }

    #[tokio::test]
    async fn panic_while_polling_becomes_error() {
        let guarded = recover()(handler_fn(|_ctx| async {
            if true {
                panic!("kaboom");
            }
            Ok(Response::text("unreachable"))
        }));

        match guarded(ctx()).await {
            Err(Error::Panic(msg)) => assert_eq!(msg, "kaboom"),
            other => panic!("expected a caught panic, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_while_building_future_becomes_error() {
        let eager: HandlerFunc = Arc::new(|_ctx: Context| -> BoxFuture<Result<Response, Error>> {
            panic!("eager {}", 7)
        });
        let guarded = recover()(eager);

        assert!(matches!(guarded(ctx()).await, Err(Error::Panic(msg)) if msg == "eager 7"));
    }

    #[tokio::test]
    async fn results_pass_through_untouched() {
        let guarded = recover()(handler_fn(|_ctx| async { Err(Error::bad_request("nope")) }));
        let err = guarded(ctx()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
