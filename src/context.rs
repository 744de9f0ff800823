//! Per-request state threaded through a handler chain.
//!
//! A [`Context`] is built from the request once its body has been read, gets
//! its route parameters and handler list from the router, and is then driven
//! by calling [`Context::next`] once. Each handler reads the request, writes
//! the buffered [`Response`] and decides whether the rest of the chain runs.

use crate::handler::{
    Chain, ChainPolicy, Cursor, FormValues, Handlers, Response, RouteParams,
    request::{decode_path, query_value},
    response::error::ResponseError,
};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body_util::Full;
use hyper::{
    HeaderMap, Method, Request, Response as HyperResponse, Uri,
    http::{Extensions, request::Parts},
};
use log::{debug, error, warn};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;

/// Shorthand for an ad-hoc JSON object body.
pub type H = serde_json::Map<String, serde_json::Value>;

pub struct Context {
    parts: Parts,
    body: Bytes,
    path: String,
    method: Method,
    status_code: u16,
    params: RouteParams,
    form: OnceCell<FormValues>,
    chain: Chain,
    response: Response,
}

impl Context {
    /// Captures the routing identity of `req`. The chain is empty until the
    /// router installs handlers.
    pub fn new(req: Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();

        Self {
            path: decode_path(parts.uri.path()),
            method: parts.method.clone(),
            parts,
            body,
            status_code: 200,
            params: RouteParams::default(),
            form: OnceCell::new(),
            chain: Chain::default(),
            response: Response::new(),
        }
    }

    pub fn with_handlers(mut self, handlers: impl Into<Handlers>) -> Self {
        self.set_handlers(handlers.into());
        self
    }

    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.set_params(params);
        self
    }

    pub fn with_policy(mut self, policy: ChainPolicy) -> Self {
        self.chain.set_policy(policy);
        self
    }

    /// Installs the handler list. Ignored once the chain has started.
    pub fn set_handlers(&mut self, handlers: Handlers) {
        self.chain.set_handlers(handlers);
    }

    /// Installs route parameters. Ignored once the chain has started.
    pub fn set_params(&mut self, params: RouteParams) {
        if self.chain.is_started() {
            warn!("route params for {} are frozen, ignoring update", self.path);
            return;
        }
        self.params = params;
    }

    /// Percent-decoded request path. [`Context::uri`] keeps the raw form.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Request header as text, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Typed per-request values handlers use to pass data down (or up) the chain.
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn cursor(&self) -> Cursor {
        self.chain.cursor()
    }

    pub fn is_exhausted(&self) -> bool {
        self.chain.cursor().is_exhausted()
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Value bound to a path parameter such as `{id}` or `{*rest}`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Value of `key` in the URL query string.
    pub fn query(&self, key: &str) -> Option<String> {
        query_value(&self.parts.uri, key)
    }

    /// Value of a form field. Url-encoded body fields win over query fields.
    ///
    /// The form is decoded on first use and cached for the rest of the request.
    pub fn post_form(&self, key: &str) -> Option<&str> {
        self.form().get(key)
    }

    pub fn form(&self) -> &FormValues {
        self.form.get_or_init(|| {
            debug!("parsing form for {} {}", self.method, self.path);
            FormValues::parse(&self.parts, &self.body)
        })
    }

    /// Records `code` and writes the status line. Headers set afterwards do
    /// not reach the client.
    pub fn status(&mut self, code: u16) {
        self.status_code = code;

        match self.response.write_head(code) {
            Ok(_) => {}
            Err(ResponseError::InvalidStatusCode(code)) => {
                error!("invalid status code {code} for {}, sending 500", self.path);
                self.status_code = 500;
                if let Err(err) = self.response.write_head(500) {
                    debug!("{err} for {}", self.path);
                }
            }
            Err(err) => debug!("superfluous status {code} for {}: {err}", self.path),
        }
    }

    /// Sets a response header. Has no effect after [`Context::status`].
    pub fn set_header(&mut self, key: &str, value: &str) {
        match self.response.try_set_header(key, value) {
            Ok(_) => {}
            Err(ResponseError::HeadersSent) => {
                debug!("header {key} set after status for {}, ignoring", self.path)
            }
            Err(err) => warn!("dropping header {key}: {err}"),
        }
    }

    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.response.write(data);
    }

    pub fn string(&mut self, code: u16, body: impl fmt::Display) {
        self.set_header("Content-Type", "text/plain");
        self.status(code);
        self.write(body.to_string());
    }

    /// Serializes `value` as a newline-terminated JSON document.
    ///
    /// Serialization happens before anything is written, so a failure turns
    /// into a plain `500` carrying the error message.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) {
        let mut body = match serde_json::to_vec(value) {
            Ok(body) => body,
            Err(err) => {
                let err = ResponseError::from(err);
                error!("{err} for {} {}", self.method, self.path);
                self.error(500, err);
                return;
            }
        };
        body.push(b'\n');

        self.set_header("Content-Type", "application/json");
        self.status(code);
        self.write(body);
    }

    pub fn html(&mut self, code: u16, html: impl AsRef<str>) {
        self.set_header("Content-Type", "text/html");
        self.status(code);
        self.write(html.as_ref());
    }

    /// Raw bytes. The content type is left to the caller.
    pub fn data(&mut self, code: u16, data: impl AsRef<[u8]>) {
        self.status(code);
        self.write(data);
    }

    /// Plain-text error reply.
    pub fn error(&mut self, code: u16, message: impl fmt::Display) {
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.set_header("X-Content-Type-Options", "nosniff");
        self.status(code);
        self.write(format!("{message}\n"));
    }

    /// Runs the rest of the chain.
    ///
    /// Advances the cursor by one and dispatches that handler; the handlers
    /// after it only run if it calls `next` in turn. The returned future
    /// resolves once everything downstream has returned, so code placed
    /// after the `.await` runs on the way back out. Once the chain is
    /// exhausted this does nothing.
    pub fn next(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Some((index, handler)) = self.chain.advance() else {
                return;
            };

            self.chain.enter(index);
            handler.call(self).await;
            self.chain.leave();
        })
    }

    pub fn into_response(self) -> HyperResponse<Full<Bytes>> {
        self.response.into_hyper()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("status_code", &self.status_code)
            .field("params", &self.params)
            .field("cursor", &self.chain.cursor())
            .field("handlers", &self.chain.len())
            .finish()
    }
}
