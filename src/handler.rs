use crate::context::Context;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;

mod next;
pub mod request;
pub mod response;

pub use next::{ChainPolicy, Cursor};
pub(crate) use next::Chain;
pub use request::{FormValues, RouteParams};
pub use response::Response;

/// Ordered, shared list of handlers run for one request.
pub type Handlers = Arc<[Arc<dyn Handler>]>;

/// A unit of request processing: middleware or a terminal route handler.
///
/// Call [`Context::next`] to run the rest of the chain; anything after the
/// `.await` runs once the rest has unwound. Returning without calling it
/// stops the chain at this handler.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, ctx: &mut Context);
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, ctx: &mut Context) {
        (**self).call(ctx).await
    }
}

// HandlerFn wrapper for closures
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    async fn call(&self, ctx: &mut Context) {
        (self.f)(ctx).await
    }
}

/// Wraps a closure returning a boxed future into a [`Handler`].
///
/// ```ignore
/// app.get("/", handler_fn(|ctx| Box::pin(async move {
///     ctx.string(200, "hello");
/// })));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    HandlerFn { f }
}

pub(crate) fn into_shared<H: Handler>(handler: H) -> Arc<dyn Handler> {
    Arc::new(handler)
}
