//! HTTP requests.
use std::cell::{OnceCell, RefCell, RefMut};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::content::{Accept, InvalidHeader};
use crate::header::Headers;
use crate::url::Url;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identity of a request, unique within the process. Request-scoped state
/// is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        Self(REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    PATCH,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::HEAD => "HEAD",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::PATCH => "PATCH",
            Self::DELETE => "DELETE",
            Self::CONNECT => "CONNECT",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
        }
    }
}

impl Default for Method {
    fn default() -> Self {
        Self::GET
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown HTTP method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_ascii_uppercase()[..] {
            "GET" => Ok(Self::GET),
            "HEAD" => Ok(Self::HEAD),
            "POST" => Ok(Self::POST),
            "PUT" => Ok(Self::PUT),
            "PATCH" => Ok(Self::PATCH),
            "DELETE" => Ok(Self::DELETE),
            "CONNECT" => Ok(Self::CONNECT),
            "OPTIONS" => Ok(Self::OPTIONS),
            "TRACE" => Ok(Self::TRACE),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message flashed to the user while handling a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub content: String,
}

/// An HTTP request.
///
/// The content stream is handed to views as-is; nothing here reads it. The
/// `Accept` header is parsed once, on first use, and kept for the lifetime
/// of the request.
///
/// # Example
/// ```
/// use jbweb::prelude::*;
///
/// let request = Request::new(Url::from_path("/greet/World"))
///     .with_method(Method::POST)
///     .with_header("Accept", "text/html");
///
/// assert_eq!(request.path(), "/greet/World");
/// assert!(request.accept().unwrap().accepts::<TextHtml>());
/// ```
pub struct Request {
    id: RequestId,
    pub url: Url,
    pub method: Method,
    pub headers: Headers,
    content: RefCell<Box<dyn Read + Send>>,
    messages: RefCell<Vec<Message>>,
    accept: OnceCell<Accept>,
}

impl Request {
    pub fn new(url: Url) -> Self {
        Self {
            id: RequestId::next(),
            url,
            method: Method::GET,
            headers: Headers::new(),
            content: RefCell::new(Box::new(io::empty())),
            messages: RefCell::new(Vec::new()),
            accept: OnceCell::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Append a header value.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let mut headers: crate::header::MutableHeaders = self.headers.into();
        headers.add_value(name, value);
        self.headers = headers.freeze();
        self
    }

    pub fn with_content<R: Read + Send + 'static>(mut self, content: R) -> Self {
        self.content = RefCell::new(Box::new(content));
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Content negotiation preferences; a missing header accepts anything.
    pub fn accept(&self) -> Result<&Accept, InvalidHeader> {
        if let Some(accept) = self.accept.get() {
            return Ok(accept);
        }
        let header = self.headers.get("accept").map(|values| values.join(","));
        let accept = Accept::from_header(header.as_deref())?;
        Ok(self.accept.get_or_init(|| accept))
    }

    /// The request content stream.
    pub fn content(&self) -> RefMut<'_, Box<dyn Read + Send>> {
        self.content.borrow_mut()
    }

    /// Read whatever remains of the content stream.
    pub fn read_content(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.content.borrow_mut().read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    pub fn flash(&self, message: &str) {
        self.messages.borrow_mut().push(Message {
            content: message.to_string(),
        });
    }

    /// Messages flashed so far, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.url.to_string())
            .field("headers", &self.headers)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::content::mediatypes::{ApplicationJson, TextHtml};

    #[test]
    fn test_defaults() {
        let request = Request::new(Url::from_path("/"));
        assert_eq!(request.method, Method::GET);
        assert!(request.headers.is_empty());
        assert_eq!(request.read_content().unwrap(), b"".to_vec());
        assert!(request.messages().is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let first = Request::new(Url::from_path("/"));
        let second = Request::new(Url::from_path("/"));
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_accept_missing_header() {
        let request = Request::new(Url::from_path("/"));
        assert_eq!(request.accept().unwrap(), &Accept::all());
    }

    #[test]
    fn test_accept_is_memoized() {
        let request = Request::new(Url::from_path("/")).with_header("Accept", "application/json");
        let first = request.accept().unwrap() as *const Accept;
        let second = request.accept().unwrap() as *const Accept;
        assert_eq!(first, second);
        assert!(request.accept().unwrap().accepts::<ApplicationJson>());
        assert!(!request.accept().unwrap().accepts::<TextHtml>());
    }

    #[test]
    fn test_accept_invalid() {
        let request = Request::new(Url::from_path("/")).with_header("accept", "text/html;q=x");
        assert!(request.accept().is_err());
    }

    #[test]
    fn test_content() {
        let request = Request::new(Url::from_path("/"))
            .with_method(Method::POST)
            .with_content(&b"title=hello"[..]);
        assert_eq!(request.read_content().unwrap(), b"title=hello".to_vec());
        assert_eq!(request.read_content().unwrap(), b"".to_vec());
    }

    #[test]
    fn test_flash() {
        let request = Request::new(Url::from_path("/"));
        request.flash("saved");
        request.flash("again");
        let messages: Vec<String> = request.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(messages, vec!["saved", "again"]);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("post".parse::<Method>(), Ok(Method::POST));
        assert_eq!(Method::DELETE.to_string(), "DELETE");
        assert!("BREW".parse::<Method>().is_err());
    }
}
