//! Radix-tree route table.
//!
//! One tree per HTTP method plus one catch-all tree for routes registered
//! with [`Engine::any`](crate::engine::Engine::any). O(path-length) lookup.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::engine::handler::HandlerFunc;

/// What a lookup resolved to.
pub(crate) enum Route {
    /// A handler plus the path parameters it matched with.
    Found(HandlerFunc, HashMap<String, String>),
    /// The path exists, but not for this method.
    MethodNotAllowed,
    NotFound,
}

#[derive(Default)]
pub(crate) struct Router {
    routes: HashMap<Method, MatchitRouter<HandlerFunc>>,
    any: MatchitRouter<HandlerFunc>,
}

impl Router {
    /// Registers `handler` under `method` + `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern or conflicts with an existing
    /// route for the same method. A broken route table is a programming error.
    pub(crate) fn insert(&mut self, method: Method, path: &str, handler: HandlerFunc) {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
    }

    /// Registers `handler` under `path` for every method not registered
    /// explicitly on that path.
    pub(crate) fn insert_any(&mut self, path: &str, handler: HandlerFunc) {
        self.any
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
    }

    /// Method-specific routes win over catch-all routes.
    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Route {
        let tree = self.routes.get(method);
        if let Some(matched) = tree.and_then(|t| t.at(path).ok()).or_else(|| self.any.at(path).ok()) {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Route::Found(Arc::clone(matched.value), params);
        }

        if self.routes.values().any(|t| t.at(path).is_ok()) {
            Route::MethodNotAllowed
        } else {
            Route::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::handler::handler_fn;
    use crate::response::Response;

    fn ok() -> HandlerFunc {
        handler_fn(|_ctx| async { Ok(Response::text("ok")) })
    }

    #[test]
    fn lookup_extracts_params() {
        let mut router = Router::default();
        router.insert(Method::GET, "/users/{id}", ok());

        match router.lookup(&Method::GET, "/users/42") {
            Route::Found(_, params) => assert_eq!(params["id"], "42"),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn lookup_distinguishes_missing_method_from_missing_path() {
        let mut router = Router::default();
        router.insert(Method::GET, "/users", ok());

        assert!(matches!(router.lookup(&Method::POST, "/users"), Route::MethodNotAllowed));
        assert!(matches!(router.lookup(&Method::GET, "/orders"), Route::NotFound));
    }

    #[test]
    fn any_matches_every_method() {
        let mut router = Router::default();
        router.insert_any("/echo", ok());

        assert!(matches!(router.lookup(&Method::PATCH, "/echo"), Route::Found(..)));
        assert!(matches!(router.lookup(&Method::DELETE, "/echo"), Route::Found(..)));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_route_panics() {
        let mut router = Router::default();
        router.insert(Method::GET, "/users/{id}", ok());
        router.insert(Method::GET, "/users/{id}", ok());
    }
}
