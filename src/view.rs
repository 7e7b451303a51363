//! Views: the application code a route dispatches to.
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::request::Request;
use crate::resource::{Bin, Needs, Resource};
use crate::response::Response;
use crate::Error;

/// A value passed to a view: a path parameter or an injected resource.
#[derive(Clone)]
pub enum Arg {
    Text(String),
    Resource(Resource),
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Resource(_) => f.write_str("<resource>"),
        }
    }
}

/// Named arguments for a view.
#[derive(Debug, Clone, Default)]
pub struct Args(HashMap<String, Arg>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.insert_text(name, value);
        self
    }

    pub fn insert_text(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), Arg::Text(value.to_string()));
    }

    pub fn insert_resource(&mut self, name: &str, resource: Resource) {
        self.0.insert(name.to_string(), Arg::Resource(resource));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.0.get(name)
    }

    /// A text argument, usually a path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(Arg::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// An injected resource, if present and of type `T`.
    pub fn resource<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.0.get(name) {
            Some(Arg::Resource(r)) => r.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.0.iter().map(|(k, v)| (&k[..], v))
    }
}

impl PartialEq for Args {
    // Resources compare by identity.
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|(name, arg)| match (arg, other.0.get(name)) {
                (Arg::Text(a), Some(Arg::Text(b))) => a == b,
                (Arg::Resource(a), Some(Arg::Resource(b))) => Arc::ptr_eq(a, b),
                _ => false,
            })
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Args {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (name, value) in iter {
            args.insert_text(name, value);
        }
        args
    }
}

/// A View takes a request, plus arguments extracted from its path or
/// injected from a [`Bin`], and produces a response.
pub trait View: Send + Sync {
    fn respond(&self, request: &Request, args: Args) -> Result<Response, Error>;

    /// Inject the named resources from `bin` into every call.
    fn needs(self, bin: &Arc<Bin>, names: &[&str]) -> Needs<Self>
    where
        Self: Sized,
    {
        bin.needs(names, self)
    }
}

impl<F> View for F
where
    F: Fn(&Request, Args) -> Result<Response, Error> + Send + Sync,
{
    fn respond(&self, request: &Request, args: Args) -> Result<Response, Error> {
        self(request, args)
    }
}

/// Pin a closure to the view signature, so that argument and error types
/// need no annotations.
///
/// ```
/// use jbweb::prelude::*;
///
/// let hello = view::from_fn(|_, _| Ok(Response::new("Hello")));
/// let response = hello.respond(&Request::new(Url::from_path("/")), Args::new()).unwrap();
/// assert_eq!(response.content, b"Hello".to_vec());
/// ```
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&Request, Args) -> Result<Response, Error> + Send + Sync,
{
    f
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::Url;

    #[test]
    fn test_args() {
        let mut args: Args = vec![("user", "World")].into_iter().collect();
        args.insert_resource("n", Arc::new(12u32));
        assert_eq!(args.param("user"), Some("World"));
        assert_eq!(args.param("n"), None);
        assert_eq!(args.resource::<u32>("n").as_deref(), Some(&12));
        assert!(args.resource::<String>("n").is_none());
        assert!(args.resource::<u32>("user").is_none());
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_args_eq() {
        let shared: Resource = Arc::new(1u8);
        let mut first = Args::new().with("a", "b");
        let mut second = Args::new().with("a", "b");
        assert_eq!(first, second);
        first.insert_resource("r", shared.clone());
        second.insert_resource("r", shared);
        assert_eq!(first, second);
        second.insert_resource("r", Arc::new(1u8));
        assert_ne!(first, second);
    }

    #[test]
    fn test_fn_view() {
        let greet = from_fn(|_, args| {
            Ok(Response::new(format!("Hey {}", args.param("user").unwrap_or("you"))))
        });
        let request = Request::new(Url::from_path("/"));
        let response = greet.respond(&request, Args::new().with("user", "World")).unwrap();
        assert_eq!(response, Response::new("Hey World"));
    }
}
