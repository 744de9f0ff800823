use crate::application::App;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{debug, error, warn};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub(crate) struct Server;

impl Server {
    /// Accepts connections until `shutdown` resolves. Each connection is
    /// served on its own task.
    pub async fn serve<F>(listener: TcpListener, app: Arc<App>, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut shutdown = pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            warn!("failed to accept connection: {}", err);
                            continue;
                        }
                    };

                    let io = TokioIo::new(stream);
                    let app = Arc::clone(&app);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { Ok::<_, Infallible>(dispatch(&app, req).await) }
                        });

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            error!("Connection error from {}: {}", peer, err);
                        }
                    });
                }
                _ = &mut shutdown => {
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Reads the body once, then hands the request to the app.
async fn dispatch(app: &App, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let (parts, body) = req.into_parts();
    let response = match Limited::new(body, app.config().max_body_bytes).collect().await {
        Ok(collected) => app.handle(Request::from_parts(parts, collected.to_bytes())).await,
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("{} {}: body exceeds {} bytes", method, path, app.config().max_body_bytes);
            reject(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
        }
        Err(err) => {
            warn!("{} {}: failed to read body: {}", method, path, err);
            reject(StatusCode::BAD_REQUEST, "failed to read request body")
        }
    };

    debug!(
        "{} {} {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}

fn reject(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from(format!("{message}\n"))));
    *res.status_mut() = status;
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res
}
