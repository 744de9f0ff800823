use bytes::BytesMut;
use error::ResponseError;
use http_body_util::Full;
use hyper::{
    HeaderMap, Response as HyperResponse, StatusCode,
    body::Bytes,
    header::{HeaderName, HeaderValue},
};
use log::error;

pub mod error;

/// Where a response is in its write sequence.
///
/// Headers can only change while `HeadersOpen`; writing the status line
/// sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WriteState {
    #[default]
    HeadersOpen,
    StatusWritten,
    BodyWritten,
}

/// Buffered outgoing response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    body: BytesMut,
    headers: HeaderMap,
    state: WriteState,
}

impl Response {
    pub fn new() -> Self {
        Response {
            status: StatusCode::OK,
            body: BytesMut::with_capacity(512),
            headers: HeaderMap::with_capacity(8),
            state: WriteState::HeadersOpen,
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers_sent(&self) -> bool {
        self.state != WriteState::HeadersOpen
    }

    /// Writes the status line, freezing the headers.
    pub fn write_head(&mut self, status: u16) -> Result<&mut Self, ResponseError> {
        let status =
            StatusCode::from_u16(status).map_err(|_| ResponseError::InvalidStatusCode(status))?;

        if self.headers_sent() {
            return Err(ResponseError::StatusAlreadyWritten);
        }

        self.status = status;
        self.state = WriteState::StatusWritten;
        Ok(self)
    }

    /// Sets a header, failing once the status line has been written.
    pub fn try_set_header(&mut self, key: &str, val: &str) -> Result<&mut Self, ResponseError> {
        if self.headers_sent() {
            return Err(ResponseError::HeadersSent);
        }

        let name = HeaderName::from_bytes(key.as_bytes())?;
        let value = HeaderValue::from_str(val)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends to the body, writing a `200` status first if none was written.
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        if self.state == WriteState::HeadersOpen {
            self.status = StatusCode::OK;
        }

        self.body.extend_from_slice(data.as_ref());
        self.state = WriteState::BodyWritten;
        self
    }

    pub fn into_hyper(self) -> HyperResponse<Full<Bytes>> {
        #[inline(always)]
        fn build_error_response() -> HyperResponse<Full<Bytes>> {
            let mut res = HyperResponse::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            res
        }

        let mut builder = HyperResponse::builder().status(self.status);

        match builder.headers_mut() {
            Some(headers) => *headers = self.headers,
            None => {
                error!("failed to build response: invalid builder state");
                return build_error_response();
            }
        }

        builder
            .body(Full::new(self.body.freeze()))
            .unwrap_or_else(|e| {
                error!("failed to build response: {}", e);
                build_error_response()
            })
    }
}

impl From<Response> for HyperResponse<Full<Bytes>> {
    fn from(resp: Response) -> Self {
        resp.into_hyper()
    }
}
