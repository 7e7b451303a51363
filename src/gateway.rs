//! Synchronous gateway adapter.
//!
//! Requests come in as a CGI-style environment (`REQUEST_METHOD`,
//! `PATH_INFO`, `HTTP_*` variables and so on) plus an input stream; the
//! response goes out through a `start_response` callback receiving the
//! status line and headers, and the returned body chunks.
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};

use log::{error, warn};
use thiserror::Error;

use crate::app::Application;
use crate::header::Headers;
use crate::request::{Method, Request, UnknownMethod};
use crate::response::Response;
use crate::routing::Mapper;
use crate::url::{Query, Url};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error(transparent)]
    Method(#[from] UnknownMethod),
}

/// The environment of one request.
pub struct Environ {
    vars: HashMap<String, String>,
    input: Box<dyn Read + Send>,
}

impl Environ {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            input: Box::new(io::empty()),
        }
    }

    pub fn from_vars<K, V, I>(vars: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ..Self::new()
        }
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_input<R: Read + Send + 'static>(mut self, input: R) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| &v[..])
            .filter(|v| !v.is_empty())
    }

    fn url(&self) -> Result<Url, GatewayError> {
        let scheme = self.var("wsgi.url_scheme").unwrap_or("http");
        let (host, port) = match self.var("HTTP_HOST") {
            Some(host) => split_port(host),
            None => (self.var("SERVER_NAME").unwrap_or(""), self.var("SERVER_PORT")),
        };
        let path = format!(
            "{}{}",
            self.var("SCRIPT_NAME").unwrap_or(""),
            self.var("PATH_INFO").unwrap_or("/")
        );
        let mut url = Url::from_path(&path)
            .with_scheme(scheme)
            .with_host(host)
            .with_query(Query::parse(self.var("QUERY_STRING").unwrap_or("")));
        if let Some(port) = port {
            let port = port
                .parse()
                .map_err(|_| GatewayError::InvalidPort(port.to_string()))?;
            url = url.with_port(port);
        }
        Ok(url.normalized())
    }

    fn headers(&self) -> Headers {
        self.vars
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(name, value)| {
                let header = match &name[..] {
                    "CONTENT_TYPE" => "content-type".to_string(),
                    "CONTENT_LENGTH" => "content-length".to_string(),
                    name => name.strip_prefix("HTTP_")?.replace('_', "-"),
                };
                Some((header, vec![value.clone()]))
            })
            .collect()
    }

    /// Build the request this environment describes.
    pub fn into_request(self) -> Result<Request, GatewayError> {
        let method = self.var("REQUEST_METHOD").unwrap_or("GET").parse::<Method>()?;
        let url = self.url()?;
        let headers = self.headers();
        Ok(Request::new(url)
            .with_method(method)
            .with_headers(headers)
            .with_content(self.input))
    }
}

impl Default for Environ {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environ").field("vars", &self.vars).finish()
    }
}

/// Split `host:port`, leaving bracketed IPv6 addresses whole.
fn split_port(host: &str) -> (&str, Option<&str>) {
    match host.rfind(':') {
        Some(i) if !host[i..].contains(']') => (&host[..i], Some(&host[i + 1..])),
        _ => (host, None),
    }
}

/// Status line and headers as handed to `start_response`: names
/// canonicalized and sorted, repeated values joined with `,`.
pub fn response_head(response: &Response) -> (String, Vec<(String, String)>) {
    let mut headers: Vec<(String, String)> = response
        .headers
        .canonicalized()
        .map(|(name, values)| (name, values.join(",")))
        .collect();
    headers.sort();
    (response.status(), headers)
}

/// Serve the request described by `environ` with `app`.
///
/// An environment that does not describe a valid request gets a 400, and
/// a view error gets a 500.
pub fn serve<M, F>(app: &Application<M>, environ: Environ, start_response: F) -> Vec<Vec<u8>>
where
    M: Mapper,
    F: FnOnce(&str, &[(String, String)]),
{
    let response = match environ.into_request() {
        Ok(request) => match app.serve(&request) {
            Ok(response) => response,
            Err(e) => {
                error!("error serving {} {}: {}", request.method, request.path(), e);
                Response::with_status_code(500)
            }
        },
        Err(e) => {
            warn!("bad request: {}", e);
            Response::with_status_code(400)
        }
    };
    let (status, headers) = response_head(&response);
    start_response(&status, &headers);
    vec![response.content]
}
