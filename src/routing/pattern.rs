//! Segment pattern routing.
//!
//! # Route patterns
//! * `/foo`: matches exactly /foo
//! * `/foo/*/bar`: matches /foo/anything/bar
//! * `/foo/**`: matches /foo and everything below it (only at the end)
//! * `/foo/{name}`: matches /foo/bar, passing `name = "bar"` to the view
//!
//! When several routes match, the most specific one wins: segments are
//! compared left to right (literal over parameter over `*`), and a full
//! pattern beats a `**` prefix. Equally specific routes are tried in the
//! order they were added.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::{with_query, BuildError, Mapped, Mapper, RouteOptions};
use crate::request::Request;
use crate::url::quote;
use crate::view::View;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RoutePart {
    Exact(String),
    Param(String),
    Any,
}

impl RoutePart {
    fn from_str(s: &str) -> Self {
        if s == "*" {
            Self::Any
        } else if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Self::Param(name.to_string())
        } else {
            Self::Exact(s.to_string())
        }
    }

    fn matches<'a>(&'a self, s: &'a str) -> Option<Option<(&'a str, &'a str)>> {
        match self {
            Self::Exact(p) if p == s => Some(None),
            Self::Exact(_) => None,
            Self::Any => Some(None),
            // An empty segment never fills a parameter.
            Self::Param(_) if s.is_empty() => None,
            Self::Param(name) => Some(Some((name.as_str(), s))),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Exact(_) => 2,
            Self::Param(_) => 1,
            Self::Any => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RoutePath {
    parts: Vec<RoutePart>,
    is_prefix: bool,
}

impl RoutePath {
    fn from_str(s: &str) -> Self {
        let (s, is_prefix) = match s.strip_suffix("**") {
            Some(prefix) => (prefix.strip_suffix('/').unwrap_or(prefix), true),
            None => (s, false),
        };
        Self {
            parts: s.split('/').map(RoutePart::from_str).collect(),
            is_prefix,
        }
    }

    fn matches<'a>(&'a self, path: &'a str) -> Option<Vec<(&'a str, &'a str)>> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < self.parts.len() {
            return None;
        }
        if segments.len() > self.parts.len() && !self.is_prefix {
            return None;
        }
        let mut params = vec![];
        for (part, segment) in self.parts.iter().zip(segments) {
            if let Some(param) = part.matches(segment)? {
                params.push(param);
            }
        }
        Some(params)
    }

    fn specificity(&self, other: &Self) -> Ordering {
        let ranks = self.parts.iter().map(RoutePart::rank);
        let other_ranks = other.parts.iter().map(RoutePart::rank);
        ranks
            .cmp(other_ranks)
            .then_with(|| other.is_prefix.cmp(&self.is_prefix))
    }

    fn build(&self, route: &str, params: &mut Vec<(&str, &str)>) -> Result<String, BuildError> {
        if self.is_prefix {
            return Err(BuildError::Wildcard(route.to_string()));
        }
        let mut segments = vec![];
        for part in &self.parts {
            match part {
                RoutePart::Exact(s) => segments.push(s.clone()),
                RoutePart::Any => return Err(BuildError::Wildcard(route.to_string())),
                RoutePart::Param(name) => {
                    let position = params
                        .iter()
                        .position(|(key, _)| *key == name.as_str())
                        .ok_or_else(|| BuildError::MissingParameter {
                            route: route.to_string(),
                            parameter: name.clone(),
                        })?;
                    let (_, value) = params.remove(position);
                    segments.push(quote(value));
                }
            }
        }
        Ok(segments.join("/"))
    }
}

struct PatternRoute {
    pattern: String,
    path: RoutePath,
    view: Arc<dyn View>,
    options: RouteOptions,
}

/// Mapper matching paths against segment patterns.
#[derive(Default)]
pub struct PatternMapper {
    // Kept sorted from most to least specific.
    routes: Vec<PatternRoute>,
    names: HashMap<String, usize>,
}

impl PatternMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Mapper for PatternMapper {
    fn add(&mut self, route: &str, view: Arc<dyn View>, options: RouteOptions) {
        let path = RoutePath::from_str(route);
        let position = self
            .routes
            .iter()
            .position(|other| path.specificity(&other.path) == Ordering::Greater)
            .unwrap_or(self.routes.len());
        for index in self.names.values_mut() {
            if *index >= position {
                *index += 1;
            }
        }
        if let Some(name) = &options.name {
            self.names.insert(name.clone(), position);
        }
        self.routes.insert(
            position,
            PatternRoute {
                pattern: route.to_string(),
                path,
                view,
                options,
            },
        );
    }

    fn map(&self, request: &Request) -> Mapped {
        for route in &self.routes {
            if !route.options.allows(request.method) {
                continue;
            }
            if let Some(params) = route.path.matches(request.path()) {
                debug!(
                    "{} {} mapped to '{}'",
                    request.method,
                    request.path(),
                    route.pattern
                );
                let mut args = route.options.default_args();
                for (name, value) in params {
                    args.insert_text(name, value);
                }
                return Mapped::Matched {
                    view: route.view.clone(),
                    args,
                };
            }
        }
        Mapped::NotMatched
    }

    fn lookup(&self, name: &str, params: &[(&str, &str)]) -> Result<String, BuildError> {
        let mut params = params.to_vec();
        let path = match self.names.get(name).and_then(|index| self.routes.get(*index)) {
            Some(route) => route.path.build(&route.pattern, &mut params)?,
            None => name.to_string(),
        };
        Ok(with_query(path, &params))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Method;
    use crate::response::Response;
    use crate::url::Url;
    use crate::view::{self, Args};

    fn echo(label: &'static str) -> Arc<dyn View> {
        Arc::new(view::from_fn(move |_, args: Args| {
            let mut params: Vec<String> = args
                .iter()
                .map(|(name, _)| format!("{}={}", name, args.param(name).unwrap_or("")))
                .collect();
            params.sort();
            Ok(Response::new(format!("{} {}", label, params.join(","))))
        }))
    }

    fn route(mapper: &PatternMapper, method: Method, path: &str) -> Option<String> {
        let request = Request::new(Url::from_path(path)).with_method(method);
        match mapper.map(&request) {
            Mapped::Matched { view, args } => view
                .respond(&request, args)
                .ok()
                .and_then(|r| String::from_utf8(r.content).ok()),
            Mapped::NotMatched => None,
        }
    }

    fn get(mapper: &PatternMapper, path: &str) -> Option<String> {
        route(mapper, Method::GET, path)
    }

    #[test]
    fn test_exact() {
        let mut mapper = PatternMapper::new();
        mapper.add("/foo", echo("foo"), RouteOptions::default());
        assert_eq!(get(&mapper, "/foo"), Some("foo ".to_string()));
        assert_eq!(get(&mapper, "/foo/bar"), None);
        assert_eq!(get(&mapper, "/"), None);
    }

    #[test]
    fn test_params() {
        let mut mapper = PatternMapper::new();
        mapper.add("/greet/{user}", echo("greet"), RouteOptions::default());
        assert_eq!(get(&mapper, "/greet/World"), Some("greet user=World".to_string()));
        assert_eq!(get(&mapper, "/greet/"), None);
        assert_eq!(get(&mapper, "/greet"), None);
    }

    #[test]
    fn test_any_and_prefix() {
        let mut mapper = PatternMapper::new();
        mapper.add("/foo/*/bar", echo("any"), RouteOptions::default());
        mapper.add("/static/**", echo("static"), RouteOptions::default());
        assert_eq!(get(&mapper, "/foo/x/bar"), Some("any ".to_string()));
        assert_eq!(get(&mapper, "/foo/x/baz"), None);
        assert_eq!(get(&mapper, "/static/css/site.css"), Some("static ".to_string()));
        assert_eq!(get(&mapper, "/static"), Some("static ".to_string()));
        assert_eq!(get(&mapper, "/stat"), None);
    }

    #[test]
    fn test_most_specific_wins() {
        let mut mapper = PatternMapper::new();
        mapper.add("/**", echo("catchall"), RouteOptions::default());
        mapper.add("/user/*", echo("any"), RouteOptions::default());
        mapper.add("/user/{name}", echo("param"), RouteOptions::default());
        mapper.add("/user/me", echo("me"), RouteOptions::default());
        assert_eq!(get(&mapper, "/user/me"), Some("me ".to_string()));
        assert_eq!(get(&mapper, "/user/bob"), Some("param name=bob".to_string()));
        assert_eq!(get(&mapper, "/elsewhere"), Some("catchall ".to_string()));
    }

    #[test]
    fn test_methods() {
        let mut mapper = PatternMapper::new();
        mapper.add("/add", echo("add"), RouteOptions::new().methods(&[Method::POST]));
        mapper.add("/{page}", echo("page"), RouteOptions::default());
        assert_eq!(route(&mapper, Method::POST, "/add"), Some("add ".to_string()));
        assert_eq!(get(&mapper, "/add"), Some("page page=add".to_string()));
        assert_eq!(route(&mapper, Method::DELETE, "/add"), None);
    }

    #[test]
    fn test_defaults() {
        let mut mapper = PatternMapper::new();
        mapper.add(
            "/greet/{user}",
            echo("greet"),
            RouteOptions::new()
                .with_default("greeting", "Hey")
                .with_default("user", "nobody"),
        );
        assert_eq!(
            get(&mapper, "/greet/World"),
            Some("greet greeting=Hey,user=World".to_string())
        );
    }

    #[test]
    fn test_lookup() {
        let mut mapper = PatternMapper::new();
        mapper.add("/greet/{user}", echo("greet"), RouteOptions::new().named("greet"));
        mapper.add("/", echo("home"), RouteOptions::new().named("home"));
        mapper.add("/static/**", echo("static"), RouteOptions::new().named("static"));

        assert_eq!(mapper.lookup("greet", &[("user", "World")]).unwrap(), "/greet/World");
        assert_eq!(
            mapper.lookup("greet", &[("user", "a b"), ("lang", "fr")]).unwrap(),
            "/greet/a%20b?lang=fr"
        );
        assert_eq!(mapper.lookup("home", &[]).unwrap(), "/");
        assert_eq!(
            mapper.lookup("greet", &[]),
            Err(BuildError::MissingParameter {
                route: "/greet/{user}".to_string(),
                parameter: "user".to_string(),
            })
        );
        assert_eq!(
            mapper.lookup("static", &[]),
            Err(BuildError::Wildcard("/static/**".to_string()))
        );
        assert_eq!(mapper.lookup("/literal", &[("x", "1")]).unwrap(), "/literal?x=1");
    }
}
