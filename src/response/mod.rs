//! HTTP response and status codes.
use crate::header::MutableHeaders;

pub mod status;

/// An HTTP response.
///
/// Two responses are equal when their content is equal; status code and
/// headers are not compared.
///
/// # Example
/// ```
/// # use jbweb::response::Response;
///
/// let response = Response::new("Hello!")
///     .with_code(201)
///     .with_header("Content-Type", "text/plain");
///
/// assert_eq!(response.status(), "201 Created");
/// assert_eq!(response, Response::new("Hello!"));
/// # assert_eq!(response.headers.get_first("content-type"), Some("text/plain"));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    pub content: Vec<u8>,
    pub code: u16,
    pub headers: MutableHeaders,
}

impl Response {
    pub fn new<C: Into<Vec<u8>>>(content: C) -> Self {
        Self {
            content: content.into(),
            code: 200,
            headers: MutableHeaders::new(),
        }
    }

    /// An empty response with the given status code.
    pub fn with_status_code(code: u16) -> Self {
        Self::default().with_code(code)
    }

    pub fn not_found() -> Self {
        Self::with_status_code(404)
    }

    /// Redirect to another location, usually with a 302.
    pub fn redirect(to: &str, code: u16) -> Self {
        Self::with_status_code(code).with_header("Location", to)
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Append a header value.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.add_value(name, value);
        self
    }

    pub fn with_headers(mut self, headers: MutableHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Status line, e.g. `"200 OK"`.
    pub fn status(&self) -> String {
        status::line(self.code)
    }

    pub fn content_length(&self) -> usize {
        self.content.len()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl Eq for Response {}
