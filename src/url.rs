//! URL parsing, normalization and serialization.
//!
//! A [`Url`] keeps two views of its scheme, host, port and userinfo: the
//! normalized values used for comparison and hashing, and the "unnormalized"
//! values exactly as they were given or parsed, kept for debugging.
//!
//! # Example
//! ```
//! use jbweb::url::Url;
//!
//! let url = Url::from_bytes(b"HTTP://user@Example.com:80/a%20b?x=1&x=2#top").unwrap();
//! assert_eq!(url.scheme(), "http");
//! assert_eq!(url.host(), "example.com");
//! assert_eq!(url.port(), None);
//! assert_eq!(url.unnormalized_port(), Some(80));
//! assert_eq!(url.path(), "/a b");
//! assert_eq!(url.query().get("x"), Some(&["1".to_string(), "2".to_string()][..]));
//! assert_eq!(url.to_string(), "http://user@example.com/a%20b?x=1&x=2#top");
//! ```
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

/// Characters escaped when writing a path. `/` is kept as the separator.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in a username or password.
const USERINFO: &AsciiSet = &PATH.add(b'/').add(b':').add(b'@');

/// Characters escaped in query keys/values and fragments.
const COMPONENT: &AsciiSet = &PATH
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'|');

/// Well-known default ports, normalized away when they match the scheme.
fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUrl {
    #[error("'{0}' is not a valid port")]
    InvalidPort(String),
    #[error("'{0}' is not a valid URL without initial '//'")]
    MissingSlashes(String),
    #[error("URL is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid path segment")]
pub struct InvalidPath(pub String);

/// Ordered multi-valued query parameters.
///
/// Keys keep the order of their first appearance, values keep the order in
/// which they were added, so `a=1&z=2&a=7` becomes `a=[1, 7], z=[2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query(Vec<(String, Vec<String>)>);

impl Query {
    pub fn new() -> Self {
        Self(vec![])
    }

    /// Parse an `application/x-www-form-urlencoded` query string. Keys
    /// without `=` get an empty value.
    pub fn parse(s: &str) -> Self {
        let mut query = Self::new();
        for pair in s.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((key, value)) => (key, value),
                None => (pair, ""),
            };
            query.add(&unquote_plus(key), &unquote_plus(value));
        }
        query
    }

    pub fn add(&mut self, key: &str, value: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => self.0.push((key.to_string(), vec![value.to_string()])),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.add(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| &values[..])
    }

    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(|v| &v[..])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (&k[..], &v[..]))
    }

    /// Serialize back to `key=value&...`, one pair per value.
    pub fn to_query_string(&self) -> String {
        let mut pairs = vec![];
        for (key, values) in &self.0 {
            for value in values {
                pairs.push(format!("{}={}", quote(key), quote(value)));
            }
        }
        pairs.join("&")
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Query {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (key, value) in iter {
            query.add(key, value);
        }
        query
    }
}

fn unquote(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

fn unquote_plus(s: &str) -> String {
    unquote(&s.replace('+', " "))
}

pub(crate) fn quote(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// An immutable URL.
#[derive(Debug, Clone, Default)]
pub struct Url {
    scheme: String,
    username: String,
    password: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Query,
    fragment: String,
    unnormalized_scheme: String,
    unnormalized_host: String,
    unnormalized_port: Option<u16>,
    // Some("") when an empty userinfo was delimited by a bare '@'.
    unnormalized_userinfo: Option<String>,
}

impl Url {
    /// Path-only URL, the common case for requests handed over by a gateway.
    pub fn from_path(path: &str) -> Self {
        Self::default().with_path(path)
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self.unnormalized_scheme = scheme.to_string();
        self
    }
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self.unnormalized_userinfo = None;
        self
    }
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self.unnormalized_userinfo = None;
        self
    }
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self.unnormalized_host = host.to_string();
        self
    }
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self.unnormalized_port = Some(port);
        self
    }
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
    pub fn with_fragment(mut self, fragment: &str) -> Self {
        self.fragment = fragment.to_string();
        self
    }

    /// Lower-case scheme and host and drop the port if it is the scheme's
    /// default. The values as given stay available through the
    /// `unnormalized_*` accessors.
    pub fn normalized(mut self) -> Self {
        self.scheme = self.scheme.to_ascii_lowercase();
        self.host = self.host.to_ascii_lowercase();
        if self.port.is_some() && self.port == default_port(&self.scheme) {
            self.port = None;
        }
        self
    }

    /// Parse and normalize a URL.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidUrl> {
        let s = std::str::from_utf8(bytes).map_err(|_| InvalidUrl::NotUtf8)?;
        Ok(parse(s)?.normalized())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn password(&self) -> &str {
        &self.password
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn port(&self) -> Option<u16> {
        self.port
    }
    /// Percent-decoded path.
    pub fn path(&self) -> &str {
        &self.path
    }
    pub fn query(&self) -> &Query {
        &self.query
    }
    pub fn fragment(&self) -> &str {
        &self.fragment
    }
    pub fn unnormalized_scheme(&self) -> &str {
        &self.unnormalized_scheme
    }
    pub fn unnormalized_host(&self) -> &str {
        &self.unnormalized_host
    }
    pub fn unnormalized_port(&self) -> Option<u16> {
        self.unnormalized_port
    }

    pub fn is_absolute(&self) -> bool {
        !self.scheme.is_empty()
    }

    pub fn query_string(&self) -> String {
        self.query.to_query_string()
    }

    /// `username[:password]`, empty when neither is set.
    pub fn userinfo(&self) -> String {
        let mut userinfo = self.username.clone();
        if !self.password.is_empty() {
            userinfo.push(':');
            userinfo.push_str(&self.password);
        }
        userinfo
    }

    pub fn unnormalized_userinfo(&self) -> String {
        match &self.unnormalized_userinfo {
            Some(userinfo) => userinfo.clone(),
            None => self.userinfo(),
        }
    }

    /// `userinfo@host:port`, with the username and password escaped.
    pub fn authority(&self) -> String {
        let mut userinfo = utf8_percent_encode(&self.username, USERINFO).to_string();
        if !self.password.is_empty() {
            userinfo.push(':');
            userinfo.push_str(&utf8_percent_encode(&self.password, USERINFO).to_string());
        }
        join_authority(Some(userinfo), &self.host, self.port)
    }

    pub fn unnormalized_authority(&self) -> String {
        let userinfo = match &self.unnormalized_userinfo {
            Some(userinfo) => Some(userinfo.clone()),
            None => Some(self.userinfo()).filter(|u| !u.is_empty()),
        };
        match userinfo {
            Some(userinfo) => format!(
                "{}@{}",
                userinfo,
                join_authority(None, &self.unnormalized_host, self.unnormalized_port)
            ),
            None => join_authority(None, &self.unnormalized_host, self.unnormalized_port),
        }
    }

    /// The URL of a direct child of this one. Query and fragment are
    /// dropped; `name` must not contain a `/`.
    pub fn child(&self, name: &str) -> Result<Self, InvalidPath> {
        self.child_with_query(name, Query::new())
    }

    pub fn child_with_query(&self, name: &str, query: Query) -> Result<Self, InvalidPath> {
        if name.contains('/') {
            return Err(InvalidPath(name.to_string()));
        }
        let mut child = self.clone();
        if !child.path.ends_with('/') {
            child.path.push('/');
        }
        child.path.push_str(name);
        child.query = query;
        child.fragment = String::new();
        Ok(child)
    }
}

fn join_authority(userinfo: Option<String>, host: &str, port: Option<u16>) -> String {
    let mut authority = String::new();
    if let Some(userinfo) = userinfo.filter(|u| !u.is_empty()) {
        authority.push_str(&userinfo);
        authority.push('@');
    }
    authority.push_str(host);
    if let Some(port) = port {
        authority.push_str(&format!(":{}", port));
    }
    authority
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        _ => false,
    }
}

fn parse(input: &str) -> Result<Url, InvalidUrl> {
    let s = input.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_control());
    let mut url = Url::default();

    let mut rest = s;
    let scheme_end = s.find(|c: char| c == '/' || c == '?' || c == '#').unwrap_or(s.len());
    if let Some((scheme, _)) = s[..scheme_end].split_once(':') {
        if is_scheme(scheme) {
            rest = &s[scheme.len() + 1..];
            if !rest.starts_with("//") {
                return Err(InvalidUrl::MissingSlashes(s.to_string()));
            }
            url = url.with_scheme(scheme);
        }
    }

    if let Some(after_slashes) = rest.strip_prefix("//") {
        let end = after_slashes
            .find(|c: char| c == '/' || c == '?' || c == '#')
            .unwrap_or(after_slashes.len());
        parse_authority(&mut url, &after_slashes[..end])?;
        rest = &after_slashes[end..];
    }

    let (rest, fragment) = match rest.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (rest, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    url.path = unquote(path);
    if let Some(query) = query {
        url.query = Query::parse(query);
    }
    if let Some(fragment) = fragment {
        url.fragment = unquote_plus(fragment);
    }
    Ok(url)
}

fn parse_authority(url: &mut Url, authority: &str) -> Result<(), InvalidUrl> {
    let hostport = match authority.rsplit_once('@') {
        Some((userinfo, hostport)) => {
            let (username, password) = match userinfo.split_once(':') {
                Some((username, password)) => (username, password),
                None => (userinfo, ""),
            };
            url.username = unquote(username);
            url.password = unquote(password);
            url.unnormalized_userinfo = Some(userinfo.to_string());
            hostport
        }
        None => authority,
    };

    // The port follows the last ':' unless that ':' is inside an IPv6 literal.
    let split = match hostport.rfind(':') {
        Some(i) if !hostport[i..].contains(']') => Some(i),
        _ => None,
    };
    let (host, port) = match split {
        Some(i) => (&hostport[..i], Some(&hostport[i + 1..])),
        None => (hostport, None),
    };
    url.host = host.to_string();
    url.unnormalized_host = host.to_string();
    if let Some(raw_port) = port.filter(|p| !p.is_empty()) {
        let decoded = unquote(raw_port);
        let port = decoded
            .parse::<u16>()
            .map_err(|_| InvalidUrl::InvalidPort(raw_port.to_string()))?;
        url.port = Some(port);
        url.unnormalized_port = Some(port);
    }
    Ok(())
}

impl FromStr for Url {
    type Err = InvalidUrl;
    fn from_str(s: &str) -> Result<Self, InvalidUrl> {
        Url::from_bytes(s.as_bytes())
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }
        let authority = self.authority();
        let has_authority = !self.scheme.is_empty() || !authority.is_empty();
        if has_authority {
            write!(f, "//{}", authority)?;
            if !self.path.is_empty() && !self.path.starts_with('/') {
                f.write_str("/")?;
            }
            write!(f, "{}", utf8_percent_encode(&self.path, PATH))?;
        } else if self.path.starts_with("//") {
            // An empty authority keeps the path from being read as one.
            write!(f, "//{}", utf8_percent_encode(&self.path, PATH))?;
        } else {
            // A ':' in the first segment would be read as a scheme.
            let (first, rest) = match self.path.find('/') {
                Some(i) => self.path.split_at(i),
                None => (&self.path[..], ""),
            };
            let first = utf8_percent_encode(first, PATH).to_string().replace(':', "%3A");
            write!(f, "{}{}", first, utf8_percent_encode(rest, PATH))?;
        }
        if !self.query.is_empty() {
            write!(f, "?{}", self.query_string())?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", quote(&self.fragment))?;
        }
        Ok(())
    }
}

impl PartialEq for Url {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.username == other.username
            && self.password == other.password
            && self.host == other.host
            && self.port == other.port
            && self.path == other.path
            && self.query == other.query
            && self.fragment == other.fragment
    }
}

impl Eq for Url {}

impl Hash for Url {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scheme.hash(state);
        self.username.hash(state);
        self.password.hash(state);
        self.host.hash(state);
        self.port.hash(state);
        self.path.hash(state);
        self.query.hash(state);
        self.fragment.hash(state);
    }
}
