//! Object traversal routing.
//!
//! Each path segment selects a child of the current resource, starting at
//! a root; the resource reached at the end responds to the request. A leaf
//! resource stops traversal early and answers for everything below it.
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::{BuildError, Mapped, Mapper, RouteOptions, SimpleMapper};
use crate::request::Request;
use crate::response::Response;
use crate::view::{Args, View};
use crate::Error;

/// A resource in a traversal tree.
pub trait Traversable: View {
    /// The child named by the next path segment, if there is one.
    fn child(&self, name: &str, request: &Request) -> Option<Arc<dyn Traversable>>;

    fn is_leaf(&self) -> bool {
        false
    }
}

/// A resource without children, responding through a view.
pub struct LeafResource<V>(pub V);

impl<V: View> View for LeafResource<V> {
    fn respond(&self, request: &Request, args: Args) -> Result<Response, Error> {
        self.0.respond(request, args)
    }
}

impl<V: View> Traversable for LeafResource<V> {
    fn child(&self, _: &str, _: &Request) -> Option<Arc<dyn Traversable>> {
        None
    }

    fn is_leaf(&self) -> bool {
        true
    }
}

/// A resource with a fixed set of named children.
pub struct TreeResource<V> {
    view: V,
    children: HashMap<String, Arc<dyn Traversable>>,
}

impl<V: View> TreeResource<V> {
    pub fn new(view: V) -> Self {
        Self {
            view,
            children: HashMap::new(),
        }
    }

    pub fn set_child(&mut self, name: &str, child: Arc<dyn Traversable>) {
        self.children.insert(name.to_string(), child);
    }

    pub fn with_child(mut self, name: &str, child: Arc<dyn Traversable>) -> Self {
        self.set_child(name, child);
        self
    }
}

impl<V: View> View for TreeResource<V> {
    fn respond(&self, request: &Request, args: Args) -> Result<Response, Error> {
        self.view.respond(request, args)
    }
}

impl<V: View> Traversable for TreeResource<V> {
    fn child(&self, name: &str, _: &Request) -> Option<Arc<dyn Traversable>> {
        self.children.get(name).cloned()
    }
}

/// Walk from `root` along the request path.
pub fn traverse(root: &Arc<dyn Traversable>, request: &Request) -> Option<Arc<dyn Traversable>> {
    let path = request.path().trim_start_matches('/');
    let mut resource = Arc::clone(root);
    if path.is_empty() {
        return Some(resource);
    }
    for segment in path.split('/') {
        if resource.is_leaf() {
            break;
        }
        resource = resource.child(segment, request)?;
    }
    Some(resource)
}

struct Traversed(Arc<dyn Traversable>);

impl View for Traversed {
    fn respond(&self, request: &Request, args: Args) -> Result<Response, Error> {
        self.0.respond(request, args)
    }
}

/// Routes registered on the static mapper are tried first; anything else
/// is found by traversal from the root.
pub struct TraversalMapper<M: Mapper = SimpleMapper> {
    root: Arc<dyn Traversable>,
    static_mapper: M,
}

impl TraversalMapper {
    pub fn new(root: Arc<dyn Traversable>) -> Self {
        Self::with_static_mapper(root, SimpleMapper::new())
    }
}

impl<M: Mapper> TraversalMapper<M> {
    pub fn with_static_mapper(root: Arc<dyn Traversable>, static_mapper: M) -> Self {
        Self {
            root,
            static_mapper,
        }
    }
}

impl<M: Mapper> Mapper for TraversalMapper<M> {
    fn add(&mut self, route: &str, view: Arc<dyn View>, options: RouteOptions) {
        self.static_mapper.add(route, view, options);
    }

    fn map(&self, request: &Request) -> Mapped {
        let mapped = self.static_mapper.map(request);
        if mapped.is_match() {
            return mapped;
        }
        match traverse(&self.root, request) {
            Some(resource) => Mapped::Matched {
                view: Arc::new(Traversed(resource)),
                args: Args::new(),
            },
            None => {
                debug!("traversal found nothing at {}", request.path());
                Mapped::NotMatched
            }
        }
    }

    fn lookup(&self, name: &str, params: &[(&str, &str)]) -> Result<String, BuildError> {
        self.static_mapper.lookup(name, params)
    }
}
