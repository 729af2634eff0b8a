//! HTTP/1.1 response builder.
//!
//! Handlers produce a [`Response`] value; only the server turns it into bytes
//! via [`Response::into_bytes`].

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::{Headers, StatusCode};
use crate::handler::Error;

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use kami::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("X-Request-Id", "abc")
///     .body("hello");
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 5\r\n"));
/// ```
#[derive(Debug, Clone)]
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

    /// Serializes `value` as the JSON body and sets `Content-Type: application/json`.
    ///
    /// # Errors
    ///
    /// Returns a `500` [`Error`] if `value` cannot be serialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use kami::http::{Response, StatusCode};
    ///
    /// let res = Response::json(StatusCode::Created, &serde_json::json!({"id": 1})).unwrap();
    /// assert_eq!(res.headers().get("content-type"), Some("application/json"));
    /// assert_eq!(res.payload(), br#"{"id":1}"#);
    /// ```
    pub fn json<T>(status: StatusCode, value: &T) -> Result<Self, Error>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(value).map_err(|e| {
            Error::new(
                StatusCode::InternalServerError,
                format!("failed to serialize JSON response: {e}"),
            )
        })?;
        Ok(Self::new(status)
            .header("Content-Type", "application/json")
            .body_bytes(body))
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Appends a header in place, for middleware decorating a downstream response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.append(name, value);
    }

    /// Sets the response body from a string.
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

    /// Controls whether `Connection: keep-alive` or `Connection: close` is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the raw body.
    pub fn payload(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body as UTF-8 text, or `None` if it is not valid UTF-8.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// Adds `Content-Type: text/plain; charset=utf-8` when the body is non-empty
    /// and no type was set, the `Connection` header, and `Content-Length` as the
    /// last header.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers.set("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        self.headers.set("Connection", connection);

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );
        buf.put(self.headers.to_string().as_bytes());
        buf.put(format!("Content-Length: {content_length}\r\n\r\n").as_bytes());
        buf.put(self.body.as_slice());

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let s = to_string(Response::new(StatusCode::Ok).body("Hello").into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn empty_body_has_no_content_type() {
        let s = to_string(Response::new(StatusCode::NoContent).into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn connection_close() {
        let s = to_string(Response::new(StatusCode::Ok).keep_alive(false).into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn json_sets_content_type_once() {
        #[derive(Serialize)]
        struct User<'a> {
            id: &'a str,
        }

        let res = Response::json(StatusCode::Ok, &User { id: "alice" }).unwrap();
        assert_eq!(res.body_text(), Some(r#"{"id":"alice"}"#));

        let s = to_string(res.into_bytes());
        assert_eq!(s.matches("Content-Type").count(), 1);
        assert!(s.contains("Content-Type: application/json\r\n"));
    }
}
