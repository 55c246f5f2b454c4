//! Minimal waypost example: CRUD-style JSON endpoints, health checks, a
//! timing middleware and a legacy-path rewrite.
//!
//! Run with:
//!   WAYPOST_ADDR=:3000 RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl http://localhost:3000/api/v1/users/42     # rewritten to /users/42
//!   curl http://localhost:3000/healthz

use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;
use waypost::{
    Config, Context, Error, HandlerFunc, MiddlewareFunc, Response, Server, StatusCode, health,
};

#[tokio::main]
async fn main() {
    let logger = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    let server = Server::new(config, logger);

    server.pre([strip_api_prefix()]);
    server.use_middleware([timing()]);

    server.get("/users/{id}", get_user, []);
    server.post("/users", create_user, []);
    server.delete("/users/{id}", delete_user, []);
    server.get("/healthz", health::liveness, []);
    server.get("/readyz", health::readiness, []);

    if let Err(e) = server.serve_until_signal(Duration::from_secs(30)).await {
        eprintln!("shutdown error: {e}");
        std::process::exit(1);
    }
}

// GET /users/{id}
async fn get_user(ctx: Context) -> Result<Response, Error> {
    let id = ctx.param("id").unwrap_or("unknown");
    Ok(Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#)))
}

// POST /users
async fn create_user(ctx: Context) -> Result<Response, Error> {
    if ctx.body().is_empty() {
        return Err(Error::bad_request("request body is required"));
    }

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#))
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_ctx: Context) -> Result<StatusCode, Error> {
    Ok(StatusCode::NO_CONTENT)
}

/// `/api/v1/users/42` → `/users/42`, before a route is picked.
fn strip_api_prefix() -> MiddlewareFunc {
    MiddlewareFunc::new(|next: HandlerFunc| {
        HandlerFunc::new(move |mut ctx: Context| {
            if let Some(rest) = ctx.path().strip_prefix("/api/v1") {
                let rest = if rest.is_empty() { "/".to_owned() } else { rest.to_owned() };
                ctx.set_path(rest);
            }
            next.call(ctx)
        })
    })
}

/// Adds an `x-response-time` header to successful responses.
fn timing() -> MiddlewareFunc {
    MiddlewareFunc::new(|next: HandlerFunc| {
        HandlerFunc::new(move |ctx: Context| {
            let next = next.clone();
            async move {
                let start = Instant::now();
                let path = ctx.path().to_owned();
                let mut res = next.call(ctx).await?;
                let elapsed = start.elapsed();
                if let Ok(value) = format!("{}us", elapsed.as_micros()).parse() {
                    res.headers_mut().insert("x-response-time", value);
                }
                info!(path = %path, elapsed_us = elapsed.as_micros() as u64, "handled");
                Ok::<_, Error>(res)
            }
        })
    })
}
