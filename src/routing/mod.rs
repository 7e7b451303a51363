//! Path based request routing.
//!
//! A [`Mapper`] finds the view registered for a request's path and method,
//! along with the arguments extracted from the path. A [`Router`] wraps a
//! mapper, dispatches to the view it finds, and answers 404 when there is
//! none.
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::render::{Rendered, Renderer};
use crate::request::{Method, Request};
use crate::response::Response;
use crate::url::Query;
use crate::view::{Args, View};
use crate::Error;

pub use pattern::PatternMapper;
pub use simple::SimpleMapper;
pub use traversal::{LeafResource, Traversable, TraversalMapper};

pub mod pattern;
pub mod simple;
pub mod traversal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("route '{route}' needs a value for '{parameter}'")]
    MissingParameter { route: String, parameter: String },
    #[error("route '{0}' has wildcards and cannot be built")]
    Wildcard(String),
}

/// How a route is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOptions {
    /// Name used for reverse lookups.
    pub name: Option<String>,
    /// Methods the route answers to.
    pub methods: Vec<Method>,
    /// Arguments passed to the view unless the path provides them.
    pub defaults: Vec<(String, String)>,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            name: None,
            methods: vec![Method::GET, Method::HEAD],
            defaults: vec![],
        }
    }
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    pub fn with_default(mut self, name: &str, value: &str) -> Self {
        self.defaults.push((name.to_string(), value.to_string()));
        self
    }

    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    fn default_args(&self) -> Args {
        self.defaults
            .iter()
            .map(|(name, value)| (&name[..], &value[..]))
            .collect()
    }
}

/// Result of mapping a request.
pub enum Mapped {
    Matched { view: Arc<dyn View>, args: Args },
    NotMatched,
}

impl Mapped {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Maps requests to views.
pub trait Mapper: Send + Sync {
    fn add(&mut self, route: &str, view: Arc<dyn View>, options: RouteOptions);

    fn map(&self, request: &Request) -> Mapped;

    /// Build the path of a named route. Unknown names are used as the path
    /// itself; parameters the route does not use go in the query string.
    fn lookup(&self, name: &str, params: &[(&str, &str)]) -> Result<String, BuildError>;
}

/// Append unused parameters to a path as a query string.
pub(crate) fn with_query(mut path: String, params: &[(&str, &str)]) -> String {
    if !params.is_empty() {
        let query: Query = params.iter().copied().collect();
        path.push('?');
        path.push_str(&query.to_query_string());
    }
    path
}

/// Router dispatches requests to the views registered with its mapper.
///
/// # Example
/// ```
/// use jbweb::prelude::*;
///
/// fn greet(_: &Request, args: Args) -> Result<Response, Error> {
///     Ok(Response::new(format!("Hey {}", args.param("user").unwrap_or("you"))))
/// }
///
/// let router = Router::new(PatternMapper::new()).with_route("/greet/{user}", greet);
///
/// let response = router.route(&Request::new(Url::from_path("/greet/World"))).unwrap();
/// assert_eq!(response.content, b"Hey World".to_vec());
///
/// let response = router.route(&Request::new(Url::from_path("/nowhere"))).unwrap();
/// assert_eq!(response.code, 404);
/// ```
pub struct Router<M: Mapper = SimpleMapper> {
    mapper: M,
}

impl<M: Mapper> Router<M> {
    pub fn new(mapper: M) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn add<V: View + 'static>(&mut self, route: &str, view: V, options: RouteOptions) {
        self.mapper.add(route, Arc::new(view), options);
    }

    /// Register a view whose return value goes through `renderer`.
    pub fn add_rendered<T, F, R>(&mut self, route: &str, view: F, renderer: R, options: RouteOptions)
    where
        T: 'static,
        F: Fn(&Request, Args) -> Result<T, Error> + Send + Sync + 'static,
        R: Renderer<T> + 'static,
    {
        self.add(route, Rendered::new(renderer, view), options);
    }

    pub fn with_route<V: View + 'static>(self, route: &str, view: V) -> Self {
        self.with_route_options(route, view, RouteOptions::default())
    }

    pub fn with_route_options<V: View + 'static>(
        mut self,
        route: &str,
        view: V,
        options: RouteOptions,
    ) -> Self {
        self.add(route, view, options);
        self
    }

    /// Dispatch a request. An unmapped request gets an empty 404; errors
    /// from the view are returned as they are.
    pub fn route(&self, request: &Request) -> Result<Response, Error> {
        match self.mapper.map(request) {
            Mapped::Matched { view, args } => view.respond(request, args),
            Mapped::NotMatched => {
                debug!("no route for {} {}", request.method, request.path());
                Ok(Response::not_found())
            }
        }
    }

    pub fn lookup(&self, name: &str, params: &[(&str, &str)]) -> Result<String, BuildError> {
        self.mapper.lookup(name, params)
    }
}

impl<M: Mapper + Default> Default for Router<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::Url;
    use crate::view;

    fn hello(_: &Request, _: Args) -> Result<Response, Error> {
        Ok(Response::new("Hello"))
    }

    #[test]
    fn test_route_not_found() {
        let router: Router = Router::default().with_route("/", hello);
        let response = router.route(&Request::new(Url::from_path("/foo"))).unwrap();
        assert_eq!(response.code, 404);
        assert!(response.content.is_empty());
    }

    #[test]
    fn test_route_found() {
        let router: Router = Router::default().with_route("/", hello);
        let response = router.route(&Request::new(Url::from_path("/"))).unwrap();
        assert_eq!(response, Response::new("Hello"));
        assert_eq!(response.code, 200);
    }

    #[test]
    fn test_view_errors_propagate() {
        let router: Router = Router::default()
            .with_route("/", view::from_fn(|_, _| Err("broken".into())));
        let err = router.route(&Request::new(Url::from_path("/"))).unwrap_err();
        assert_eq!(err.to_string(), "broken");
    }

    #[test]
    fn test_with_query() {
        assert_eq!(with_query("/a".to_string(), &[]), "/a");
        assert_eq!(with_query("/a".to_string(), &[("x", "1 2")]), "/a?x=1%202");
    }

    #[test]
    fn test_route_options() {
        let options = RouteOptions::new()
            .named("greet")
            .methods(&[Method::POST])
            .with_default("greeting", "Hey");
        assert!(options.allows(Method::POST));
        assert!(!options.allows(Method::GET));
        assert_eq!(options.default_args().param("greeting"), Some("Hey"));
        assert!(RouteOptions::default().allows(Method::HEAD));
    }
}
