use crate::handler::Handler;
use hyper::Method;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Handlers registered for one path pattern, keyed by method.
#[derive(Clone, Default)]
pub struct Route {
    pub path: String,
    handlers: FxHashMap<Method, Vec<Arc<dyn Handler>>>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handlers: FxHashMap::default(),
        }
    }

    /// Appends to the chain for `method`; registering a method twice extends it.
    pub fn push(&mut self, method: Method, handlers: impl IntoIterator<Item = Arc<dyn Handler>>) {
        self.handlers.entry(method).or_default().extend(handlers);
    }

    pub fn handlers(&self, method: &Method) -> Option<&[Arc<dyn Handler>]> {
        self.handlers.get(method).map(Vec::as_slice)
    }

    /// Methods with handlers, sorted, as used for the `Allow` header.
    pub fn allowed(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.handlers.keys().map(Method::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("methods", &self.allowed())
            .finish()
    }
}
