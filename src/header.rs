//! Case-insensitive, multi-valued HTTP headers.
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use thiserror::Error;

/// Names whose wire capitalization is not plain title-case.
const CANONICAL_NAMES: [(&str, &str); 7] = [
    ("content-md5", "Content-MD5"),
    ("dnt", "DNT"),
    ("etag", "ETag"),
    ("p3p", "P3P"),
    ("te", "TE"),
    ("www-authenticate", "WWW-Authenticate"),
    ("x-xss-protection", "X-XSS-Protection"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no such header: {0}")]
pub struct NoSuchHeader(pub String);

/// Wire capitalization of a header name, `content-type` -> `Content-Type`.
pub fn canonical_name(name: &str) -> String {
    let name = name.to_ascii_lowercase();
    if let Some((_, canonical)) = CANONICAL_NAMES.iter().find(|(lower, _)| *lower == name) {
        return canonical.to_string();
    }
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Immutable headers. Names are stored lower-cased, each with its list of
/// raw values in the order they were received.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    contents: HashMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contents.contains_key(&name.to_ascii_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.contents
            .get(&name.to_ascii_lowercase())
            .map(|values| &values[..])
    }

    pub fn try_get(&self, name: &str) -> Result<&[String], NoSuchHeader> {
        self.get(name).ok_or_else(|| NoSuchHeader(name.to_string()))
    }

    /// First value of the named header.
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(|v| &v[..])
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Lower-cased names with their values, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.contents.iter().map(|(k, v)| (&k[..], &v[..]))
    }

    /// Wire-capitalized names with their values, in no particular order;
    /// sort the result if you need it to be deterministic.
    pub fn canonicalized(&self) -> impl Iterator<Item = (String, &[String])> {
        self.contents
            .iter()
            .map(|(name, values)| (canonical_name(name), &values[..]))
    }
}

impl<N: AsRef<str>> FromIterator<(N, Vec<String>)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, Vec<String>)>>(iter: I) -> Self {
        Self {
            contents: iter
                .into_iter()
                .map(|(name, values)| (name.as_ref().to_ascii_lowercase(), values))
                .collect(),
        }
    }
}

impl<'a, 'b, 'c> FromIterator<(&'a str, &'b [&'c str])> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'b [&'c str])>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(name, values)| {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                (name, values)
            })
            .collect::<Headers>()
    }
}

impl Hash for Headers {
    // Entry hashes are combined with xor so iteration order does not matter.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combined = 0u64;
        for entry in &self.contents {
            let mut hasher = DefaultHasher::new();
            entry.hash(&mut hasher);
            combined ^= hasher.finish();
        }
        state.write_u64(combined);
    }
}

fn debug_contents(headers: &Headers, kind: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut contents: Vec<(String, &[String])> = headers.canonicalized().collect();
    contents.sort();
    let contents: Vec<String> = contents
        .iter()
        .map(|(name, values)| format!("{}={:?}", name, values))
        .collect();
    write!(f, "<{} contents={{{}}}>", kind, contents.join(" "))
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_contents(self, "Headers", f)
    }
}

/// Headers that can be changed after construction. Read access goes
/// through [`Headers`]; this type is deliberately not `Hash`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MutableHeaders(Headers);

impl MutableHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values of a header.
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        self.0.contents.insert(name.to_ascii_lowercase(), values);
    }

    /// Append a value, creating the header if needed.
    pub fn add_value(&mut self, name: &str, value: &str) {
        self.0
            .contents
            .entry(name.to_ascii_lowercase())
            .or_insert_with(Vec::new)
            .push(value.to_string());
    }

    /// Remove a header, returning its values if it was present.
    pub fn discard(&mut self, name: &str) -> Option<Vec<String>> {
        self.0.contents.remove(&name.to_ascii_lowercase())
    }

    /// Remove a header that must be present.
    pub fn remove(&mut self, name: &str) -> Result<Vec<String>, NoSuchHeader> {
        self.discard(name)
            .ok_or_else(|| NoSuchHeader(name.to_string()))
    }

    pub fn freeze(self) -> Headers {
        self.0
    }
}

impl Deref for MutableHeaders {
    type Target = Headers;
    fn deref(&self) -> &Headers {
        &self.0
    }
}

impl From<Headers> for MutableHeaders {
    fn from(headers: Headers) -> Self {
        Self(headers)
    }
}

impl<T> FromIterator<T> for MutableHeaders
where
    Headers: FromIterator<T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for MutableHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_contents(&self.0, "MutableHeaders", f)
    }
}
