use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::{with_query, BuildError, Mapped, Mapper, RouteOptions};
use crate::request::Request;
use crate::view::View;

struct SimpleRoute {
    view: Arc<dyn View>,
    options: RouteOptions,
}

/// Exact path lookup, without parameters. A path may be registered several
/// times for different methods; the first registration allowing the
/// request's method wins.
#[derive(Default)]
pub struct SimpleMapper {
    routes: HashMap<String, Vec<SimpleRoute>>,
    names: HashMap<String, String>,
}

impl SimpleMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Mapper for SimpleMapper {
    fn add(&mut self, route: &str, view: Arc<dyn View>, options: RouteOptions) {
        if let Some(name) = &options.name {
            self.names.insert(name.clone(), route.to_string());
        }
        self.routes
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(SimpleRoute { view, options });
    }

    fn map(&self, request: &Request) -> Mapped {
        let found = self.routes.get(request.path()).and_then(|routes| {
            routes
                .iter()
                .find(|route| route.options.allows(request.method))
        });
        match found {
            Some(route) => {
                debug!("{} {} mapped", request.method, request.path());
                Mapped::Matched {
                    view: route.view.clone(),
                    args: route.options.default_args(),
                }
            }
            None => Mapped::NotMatched,
        }
    }

    fn lookup(&self, name: &str, params: &[(&str, &str)]) -> Result<String, BuildError> {
        let path = self.names.get(name).map_or(name, |path| &path[..]);
        Ok(with_query(path.to_string(), params))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Method;
    use crate::response::Response;
    use crate::url::Url;
    use crate::view::{self, Args};

    fn text_view(body: &'static str) -> Arc<dyn View> {
        Arc::new(view::from_fn(move |_, _| Ok(Response::new(body))))
    }

    fn request(method: Method, path: &str) -> Request {
        Request::new(Url::from_path(path)).with_method(method)
    }

    fn respond(mapped: Mapped, request: &Request) -> Option<Response> {
        match mapped {
            Mapped::Matched { view, args } => view.respond(request, args).ok(),
            Mapped::NotMatched => None,
        }
    }

    #[test]
    fn test_map() {
        let mut mapper = SimpleMapper::new();
        mapper.add("/", text_view("root"), RouteOptions::default());
        let get = request(Method::GET, "/");
        assert_eq!(respond(mapper.map(&get), &get), Some(Response::new("root")));
        let head = request(Method::HEAD, "/");
        assert!(mapper.map(&head).is_match());
    }

    #[test]
    fn test_no_match() {
        let mut mapper = SimpleMapper::new();
        mapper.add("/", text_view("root"), RouteOptions::default());
        assert!(!mapper.map(&request(Method::GET, "/other")).is_match());
    }

    #[test]
    fn test_method_mismatch() {
        let mut mapper = SimpleMapper::new();
        mapper.add("/add", text_view("added"), RouteOptions::new().methods(&[Method::POST]));
        assert!(!mapper.map(&request(Method::GET, "/add")).is_match());
        assert!(mapper.map(&request(Method::POST, "/add")).is_match());
    }

    #[test]
    fn test_same_path_different_methods() {
        let mut mapper = SimpleMapper::new();
        mapper.add("/entry", text_view("show"), RouteOptions::default());
        mapper.add("/entry", text_view("create"), RouteOptions::new().methods(&[Method::POST]));
        let post = request(Method::POST, "/entry");
        assert_eq!(respond(mapper.map(&post), &post), Some(Response::new("create")));
        let get = request(Method::GET, "/entry");
        assert_eq!(respond(mapper.map(&get), &get), Some(Response::new("show")));
    }

    #[test]
    fn test_defaults_are_passed() {
        let mut mapper = SimpleMapper::new();
        let echo: Arc<dyn View> = Arc::new(view::from_fn(|_, args: Args| {
            Ok(Response::new(args.param("greeting").unwrap_or("").to_string()))
        }));
        mapper.add("/", echo, RouteOptions::new().with_default("greeting", "Hey"));
        let get = request(Method::GET, "/");
        assert_eq!(respond(mapper.map(&get), &get), Some(Response::new("Hey")));
    }

    #[test]
    fn test_lookup() {
        let mut mapper = SimpleMapper::new();
        mapper.add("/", text_view("root"), RouteOptions::new().named("home"));
        assert_eq!(mapper.lookup("home", &[]).unwrap(), "/");
        assert_eq!(mapper.lookup("home", &[("page", "2")]).unwrap(), "/?page=2");
        assert_eq!(mapper.lookup("/literal", &[("a", "b")]).unwrap(), "/literal?a=b");
    }
}
