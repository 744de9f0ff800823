//! A small HTTP framework built around a per-request [`Context`] and an
//! onion-style handler chain.
//!
//! ```ignore
//! use glint::{app, handler_fn};
//!
//! let mut app = app();
//! app.use_handler(handler_fn(|ctx| Box::pin(async move {
//!     let start = std::time::Instant::now();
//!     ctx.next().await;
//!     log::info!("{} {} {:?}", ctx.method(), ctx.path(), start.elapsed());
//! })));
//! app.get("/hello/{name}", handler_fn(|ctx| Box::pin(async move {
//!     let name = ctx.param("name").unwrap_or("world").to_owned();
//!     ctx.string(200, format_args!("hello {name}"));
//! })));
//! app.listen(8080, |addr| println!("listening on {addr}")).await?;
//! ```

pub mod application;
pub mod config;
pub mod context;
pub mod handler;
pub mod router;
mod server;

pub use application::{App, Group};
pub use config::Config;
pub use context::{Context, H};
pub use handler::{ChainPolicy, Cursor, Handler, HandlerFn, Handlers, handler_fn};
pub use router::RouteError;
pub use server::ServerError;

pub fn app() -> App {
    App::default()
}
