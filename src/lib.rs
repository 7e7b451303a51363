//! A minimalist web application micro-framework. This is a learning project, use at your own risk.
//! * [URLs](crate::url::Url) and case-insensitive [headers](crate::header::Headers)
//! * `Accept` header [content negotiation](crate::content::Accept)
//! * Path-based [routing](crate::routing::Router) with [patterns](crate::routing::PatternMapper)
//!   and [object traversal](crate::routing::TraversalMapper)
//! * Request-scoped [resources](crate::resource::Bin) injected into views
//! * [Renderers](crate::render) for text and, with the `json` feature, JSON
//! * A CGI-style [gateway](crate::gateway) adapter
//!
//! # Example
//! ```
//! use jbweb::prelude::*;
//!
//! fn greet(_: &Request, args: Args) -> Result<Response, Error> {
//!     Ok(Response::new(format!("Hello {}", args.param("name").unwrap_or("stranger"))))
//! }
//!
//! let mut app = Application::with_router(Router::new(PatternMapper::new()));
//! app.route("/greet/{name}", greet, RouteOptions::new().named("greet"));
//!
//! let request = Request::new(Url::from_path("/greet/Bob"));
//! assert_eq!(app.serve(&request).unwrap(), Response::new("Hello Bob"));
//! assert_eq!(app.url_for("greet", &[("name", "Alice")]).unwrap(), "/greet/Alice");
//! ```
pub mod app;
pub mod config;
pub mod content;
pub mod gateway;
pub mod header;
pub mod manager;
pub mod prelude;
pub mod render;
pub mod request;
pub mod resource;
pub mod response;
pub mod routing;
pub mod url;
pub mod view;

/// Errors views, renderers and resource factories may fail with.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
