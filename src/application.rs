use crate::config::Config;
use crate::context::Context;
use crate::handler::{Handler, into_shared};
use crate::router::{RouteError, Router};
use crate::server::{Server, ServerError};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Default)]
pub struct App {
    config: Config,
    router: Router,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            router: Router::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Adds middleware that runs in front of every request.
    pub fn use_handler(&mut self, handler: impl Handler) -> &mut Self {
        self.router.use_handler(into_shared(handler));
        self
    }

    /// Registers a chain of handlers for `method` and `path`.
    pub fn route(
        &mut self,
        method: Method,
        path: impl AsRef<str>,
        handlers: Vec<Arc<dyn Handler>>,
    ) -> Result<&mut Self, RouteError> {
        self.router.route(method, path.as_ref(), handlers)?;
        Ok(self)
    }

    /// Starts a group of routes sharing a path prefix and middleware.
    pub fn group(&mut self, prefix: impl Into<String>) -> Group<'_> {
        Group {
            app: self,
            prefix: prefix.into(),
            middleware: Vec::new(),
        }
    }

    /// Runs one request through its chain and returns the finished response.
    pub async fn handle(&self, req: Request<Bytes>) -> Response<Full<Bytes>> {
        let mut ctx = Context::new(req).with_policy(self.config.chain_policy);

        let (handlers, params) = self.router.resolve(ctx.method(), ctx.uri().path());
        ctx.set_params(params);
        ctx.set_handlers(handlers);

        ctx.next().await;
        ctx.into_response()
    }

    /// Serves on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        Server::serve(listener, Arc::new(self), shutdown).await
    }

    /// Binds `0.0.0.0:port` and serves until Ctrl+C.
    pub async fn listen<T: FnOnce(SocketAddr)>(
        self,
        port: u16,
        callback: T,
    ) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        if let Ok(ip) = local_ip_address::local_ip() {
            info!("Network: http://{}:{}", ip, port);
        }

        callback(listener.local_addr()?);

        self.serve(listener, async {
            if let Err(err) = signal::ctrl_c().await {
                error!("failed to listen for ctrl_c: {}", err);
                std::future::pending::<()>().await;
            }
            info!("🛑 Received Ctrl+C, shutting down server...");
        })
        .await
    }
}

/// Routes registered under a common prefix, with middleware of their own.
pub struct Group<'a> {
    app: &'a mut App,
    prefix: String,
    middleware: Vec<Arc<dyn Handler>>,
}

impl Group<'_> {
    /// Adds middleware for routes registered through this group afterwards.
    pub fn use_handler(&mut self, handler: impl Handler) -> &mut Self {
        self.middleware.push(into_shared(handler));
        self
    }

    pub fn group(&mut self, prefix: impl AsRef<str>) -> Group<'_> {
        Group {
            prefix: format!("{}{}", self.prefix, prefix.as_ref()),
            middleware: self.middleware.clone(),
            app: &mut *self.app,
        }
    }

    pub fn route(
        &mut self,
        method: Method,
        path: impl AsRef<str>,
        handlers: Vec<Arc<dyn Handler>>,
    ) -> Result<&mut Self, RouteError> {
        let chain = self.middleware.iter().cloned().chain(handlers).collect();
        let path = format!("{}{}", self.prefix, path.as_ref());
        self.app.route(method, path, chain)?;
        Ok(self)
    }
}

macro_rules! generate_methods {
    (
        $target:ty, methods: [$($method:ident => $verb:ident),* $(,)?]
    ) => {
        impl $target {
            $(
                #[doc = concat!("Registers a `", stringify!($verb), "` handler.")]
                ///
                /// # Panics
                /// Panics if the path conflicts with an existing route.
                pub fn $method(&mut self, path: impl AsRef<str>, handler: impl Handler) -> &mut Self {
                    let path = path.as_ref();
                    if let Err(err) = self.route(Method::$verb, path, vec![into_shared(handler)]) {
                        panic!("{}", err);
                    }
                    self
                }
            )*
        }
    };
}

generate_methods! {
    App, methods: [
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
        connect => CONNECT,
        trace => TRACE,
    ]
}

generate_methods! {
    Group<'_>, methods: [
        get => GET,
        post => POST,
        put => PUT,
        delete => DELETE,
        patch => PATCH,
        head => HEAD,
        options => OPTIONS,
        connect => CONNECT,
        trace => TRACE,
    ]
}
