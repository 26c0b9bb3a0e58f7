//! Outgoing responses: a small builder plus HTTP/1.1 encoding.

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use tracing::error;

use super::{Headers, StatusCode};

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use holiday_lens::http::{Response, StatusCode};
///
/// let response = Response::json(StatusCode::Ok, &["US", "GB"]);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Type: application/json\r\n"));
/// assert!(text.ends_with(r#"["US","GB"]"#));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
        }
    }

    /// Creates a response whose body is `value` serialized as JSON.
    ///
    /// Serialization failures are logged and turned into an empty
    /// `500 Internal Server Error`.
    pub fn json<T>(status: StatusCode, value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .header("Content-Type", "application/json")
                .body_bytes(body),
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self::new(StatusCode::InternalServerError)
            }
        }
    }

    /// Sets a response header, replacing any earlier value for the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Sets the response body from a string.
    ///
    /// The `Content-Length` header is written automatically by [`into_bytes`](Self::into_bytes).
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers set so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body bytes.
    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Encodes the status line, headers, and body for the wire.
    ///
    /// `Content-Length` and `Connection` are always written; a non-empty body
    /// without a `Content-Type` is labelled as UTF-8 text.
    pub fn into_bytes(mut self) -> BytesMut {
        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers.set("Content-Type", "text/plain; charset=utf-8");
        }
        self.headers
            .set("Connection", if self.keep_alive { "keep-alive" } else { "close" });
        self.headers.set("Content-Length", self.body.len().to_string());

        let mut buf = BytesMut::with_capacity(64 + self.headers.len() * 48 + self.body.len());
        buf.put(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put_slice(b"\r\n");
        buf.put_slice(&self.body);
        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}
