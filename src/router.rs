use crate::context::Context;
use crate::handler::{Handler, Handlers, RouteParams};
use async_trait::async_trait;
use hyper::Method;
use matchit::Router as MatchitRouter;
use route::Route;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

mod route;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route {path} conflicts with an existing route: {source}")]
    Conflict {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("route {0} registered without handlers")]
    NoHandlers(String),
}

/// Maps `(method, path)` to the chain that serves it.
///
/// Global middleware is prepended to every chain, including the 404 and 405
/// fallbacks.
#[derive(Default)]
pub struct Router {
    middleware: Vec<Arc<dyn Handler>>,
    routes: Vec<Route>,
    by_path: FxHashMap<String, usize>,
    matcher: MatchitRouter<usize>,
}

impl Router {
    pub fn use_handler(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.middleware.push(handler);
        self
    }

    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handlers: Vec<Arc<dyn Handler>>,
    ) -> Result<&mut Self, RouteError> {
        if handlers.is_empty() {
            return Err(RouteError::NoHandlers(path.to_owned()));
        }

        let index = match self.by_path.get(path) {
            Some(&index) => index,
            None => {
                let index = self.routes.len();
                self.matcher
                    .insert(path, index)
                    .map_err(|source| RouteError::Conflict {
                        path: path.to_owned(),
                        source,
                    })?;
                self.routes.push(Route::new(path));
                self.by_path.insert(path.to_owned(), index);
                index
            }
        };

        self.routes[index].push(method, handlers);
        Ok(self)
    }

    /// Builds the chain and route parameters for a request.
    pub fn resolve(&self, method: &Method, path: &str) -> (Handlers, RouteParams) {
        let mut chain = self.middleware.clone();

        let params = match self.matcher.at(path) {
            Ok(matched) => {
                let route = &self.routes[*matched.value];
                match route.handlers(method) {
                    Some(handlers) => chain.extend(handlers.iter().cloned()),
                    None => chain.push(Arc::new(MethodNotAllowed {
                        allow: route.allowed().join(", "),
                    })),
                }
                RouteParams::from(matched.params)
            }
            Err(_) => {
                chain.push(Arc::new(NotFound));
                RouteParams::default()
            }
        };

        (chain.into(), params)
    }
}

struct NotFound;

#[async_trait]
impl Handler for NotFound {
    async fn call(&self, ctx: &mut Context) {
        ctx.string(404, "404 page not found");
    }
}

struct MethodNotAllowed {
    allow: String,
}

#[async_trait]
impl Handler for MethodNotAllowed {
    async fn call(&self, ctx: &mut Context) {
        ctx.set_header("Allow", &self.allow);
        ctx.string(405, "405 method not allowed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;

    fn noop() -> Arc<dyn Handler> {
        Arc::new(handler_fn(|_ctx| Box::pin(async {})))
    }

    #[test]
    fn resolves_params_and_chain() {
        let mut router = Router::default();
        router.use_handler(noop());
        router
            .route(Method::GET, "/users/{id}", vec![noop(), noop()])
            .unwrap();

        let (chain, params) = router.resolve(&Method::GET, "/users/42");
        assert_eq!(chain.len(), 3);
        assert_eq!(params.get("id"), Some("42"));
    }

    #[test]
    fn same_route_twice_extends_chain() {
        let mut router = Router::default();
        router.route(Method::GET, "/hello", vec![noop()]).unwrap();
        router.route(Method::GET, "/hello", vec![noop()]).unwrap();
        router.route(Method::POST, "/hello", vec![noop()]).unwrap();

        let (chain, _) = router.resolve(&Method::GET, "/hello");
        assert_eq!(chain.len(), 2);
        assert_eq!(router.routes[0].allowed(), vec!["GET", "POST"]);
    }

    #[test]
    fn unknown_path_gets_middleware_and_fallback() {
        let mut router = Router::default();
        router.use_handler(noop());

        let (chain, params) = router.resolve(&Method::GET, "/missing");
        assert_eq!(chain.len(), 2);
        assert!(params.is_empty());
    }

    #[test]
    fn conflicting_routes_are_rejected() {
        let mut router = Router::default();
        router.route(Method::GET, "/users/{id}", vec![noop()]).unwrap();

        assert!(matches!(
            router.route(Method::GET, "/users/{name}", vec![noop()]),
            Err(RouteError::Conflict { .. })
        ));
    }

    #[test]
    fn empty_handler_list_is_rejected() {
        let mut router = Router::default();

        assert!(matches!(
            router.route(Method::GET, "/", Vec::new()),
            Err(RouteError::NoHandlers(_))
        ));
    }
}
