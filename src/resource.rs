//! Resources and dependency injection.
//!
//! A [`Bin`] maps names to either global values or factories. Globals are
//! handed out as-is. Factories are instantiated at most once per request:
//! the instance is cached in the request's scoped state (see
//! [`Manager`]) and dropped with it.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use jbweb::prelude::*;
//!
//! let bin = Arc::new(Bin::new(Arc::new(Manager::new())));
//! bin.add_global("greeting", String::from("Hey")).unwrap();
//! bin.provides("counter", || Ok(std::sync::atomic::AtomicU32::new(0))).unwrap();
//!
//! let request = Request::new(Url::from_path("/"));
//! let first = bin.provide("counter", Some(&request)).unwrap();
//! let second = bin.provide("counter", Some(&request)).unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//!
//! let greeting = bin.provide_as::<String>("greeting", None).unwrap();
//! assert_eq!(*greeting, "Hey");
//! ```
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use thiserror::Error;

use crate::manager::Manager;
use crate::request::Request;
use crate::response::Response;
use crate::view::{Args, View};
use crate::Error;

/// A shared, type-erased resource instance.
pub type Resource = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("'{0}' is already provided")]
    Duplicate(String),
    #[error("no such resource: {0}")]
    NoSuch(String),
    #[error("the '{0}' resource needs a request")]
    NeedsRequest(String),
    #[error("resource '{0}' is not of the requested type")]
    WrongType(String),
    #[error("resource '{name}' could not be created")]
    Failed {
        name: String,
        #[source]
        source: Error,
    },
}

type PlainFactory = dyn Fn() -> Result<Resource, Error> + Send + Sync;
type RequestFactory = dyn Fn(&Request) -> Result<Resource, Error> + Send + Sync;

#[derive(Clone)]
enum Provider {
    Plain(Arc<PlainFactory>),
    WithRequest(Arc<RequestFactory>),
}

#[derive(Clone, Default)]
struct Registry {
    providers: HashMap<String, Provider>,
    globals: HashMap<String, Resource>,
}

impl Registry {
    fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name) || self.globals.contains_key(name)
    }
}

/// A registry of named resources.
///
/// Registration normally happens once, while the application is set up;
/// resolution happens while serving.
pub struct Bin {
    manager: Arc<Manager>,
    registry: RwLock<Registry>,
}

impl Bin {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self {
            manager,
            registry: RwLock::new(Registry::default()),
        }
    }

    fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    fn register(&self, name: &str, provider: Provider) -> Result<(), ResourceError> {
        let mut registry = self.registry_mut();
        if registry.contains(name) {
            return Err(ResourceError::Duplicate(name.to_string()));
        }
        registry.providers.insert(name.to_string(), provider);
        Ok(())
    }

    /// Register a request-scoped resource, created by calling `factory`
    /// with no arguments.
    pub fn provides<T, F>(&self, name: &str, factory: F) -> Result<(), ResourceError>
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory = move || -> Result<Resource, Error> { Ok(Arc::new(factory()?)) };
        self.register(name, Provider::Plain(Arc::new(factory)))
    }

    /// Register a request-scoped resource whose factory needs the request.
    pub fn provides_with_request<T, F>(&self, name: &str, factory: F) -> Result<(), ResourceError>
    where
        T: Any + Send + Sync,
        F: Fn(&Request) -> Result<T, Error> + Send + Sync + 'static,
    {
        let factory =
            move |request: &Request| -> Result<Resource, Error> { Ok(Arc::new(factory(request)?)) };
        self.register(name, Provider::WithRequest(Arc::new(factory)))
    }

    /// Register a global, shared by every request.
    pub fn add_global<T: Any + Send + Sync>(&self, name: &str, value: T) -> Result<(), ResourceError> {
        self.add_shared_global(name, Arc::new(value))
    }

    /// Register an already shared global without wrapping it again.
    pub fn add_shared_global<T: Any + Send + Sync>(
        &self,
        name: &str,
        value: Arc<T>,
    ) -> Result<(), ResourceError> {
        let mut registry = self.registry_mut();
        if registry.contains(name) {
            return Err(ResourceError::Duplicate(name.to_string()));
        }
        registry.globals.insert(name.to_string(), value);
        Ok(())
    }

    /// Bind a global, replacing whatever was registered under `name`.
    pub(crate) fn set_global<T: Any + Send + Sync>(&self, name: &str, value: Arc<T>) {
        let mut registry = self.registry_mut();
        registry.providers.remove(name);
        registry.globals.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry().contains(name)
    }

    /// Names of all resources and globals, sorted.
    pub fn names(&self) -> Vec<String> {
        let registry = self.registry();
        let mut names: Vec<String> = registry
            .providers
            .keys()
            .chain(registry.globals.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Resolve a resource.
    ///
    /// Globals need no request. Anything else is looked up in the request's
    /// scoped state, and created there on first use.
    pub fn provide(&self, name: &str, request: Option<&Request>) -> Result<Resource, ResourceError> {
        let provider = {
            let registry = self.registry();
            if let Some(global) = registry.globals.get(name) {
                return Ok(global.clone());
            }
            match registry.providers.get(name) {
                Some(provider) => provider.clone(),
                None => return Err(ResourceError::NoSuch(name.to_string())),
            }
        };
        let request = request.ok_or_else(|| ResourceError::NeedsRequest(name.to_string()))?;
        if let Some(resource) = self.manager.scoped_resource(request.id(), name) {
            return Ok(resource);
        }

        debug!("creating resource '{}' for request {}", name, request.id());
        let created = match provider {
            Provider::Plain(factory) => factory(),
            Provider::WithRequest(factory) => factory(request),
        };
        let resource = created.map_err(|source| ResourceError::Failed {
            name: name.to_string(),
            source,
        })?;
        Ok(self.manager.store_resource(request.id(), name, resource))
    }

    /// Resolve a resource as a concrete type.
    pub fn provide_as<T: Any + Send + Sync>(
        &self,
        name: &str,
        request: Option<&Request>,
    ) -> Result<Arc<T>, ResourceError> {
        self.provide(name, request)?
            .downcast::<T>()
            .map_err(|_| ResourceError::WrongType(name.to_string()))
    }

    /// Add the named resources to `args`, except those already given.
    pub fn inject(
        &self,
        names: &[String],
        request: Option<&Request>,
        mut args: Args,
    ) -> Result<Args, ResourceError> {
        for name in names {
            if !args.contains(name) {
                args.insert_resource(name, self.provide(name, request)?);
            }
        }
        Ok(args)
    }

    /// Wrap a view so the named resources are injected into its arguments.
    /// Arguments passed explicitly take precedence.
    pub fn needs<V: View>(self: &Arc<Self>, names: &[&str], view: V) -> Needs<V> {
        Needs {
            bin: Arc::clone(self),
            names: names.iter().map(|name| name.to_string()).collect(),
            view,
        }
    }

    /// Forget a resource or global. Unknown names are ignored.
    pub fn remove(&self, name: &str) {
        let mut registry = self.registry_mut();
        registry.providers.remove(name);
        registry.globals.remove(name);
    }

    /// Copy every registration of `other` into this bin, replacing
    /// registrations with the same name.
    pub fn update(&self, other: &Bin) {
        let other = other.registry().clone();
        let mut registry = self.registry_mut();
        for (name, provider) in other.providers {
            registry.globals.remove(&name);
            registry.providers.insert(name, provider);
        }
        for (name, global) in other.globals {
            registry.providers.remove(&name);
            registry.globals.insert(name, global);
        }
    }
}

impl fmt::Debug for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Bin: {:?}>", self.names())
    }
}

/// A view with resources injected from a [`Bin`].
pub struct Needs<V> {
    bin: Arc<Bin>,
    names: Vec<String>,
    view: V,
}

impl<V> Needs<V> {
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<V: View> View for Needs<V> {
    fn respond(&self, request: &Request, args: Args) -> Result<Response, Error> {
        let args = self.bin.inject(&self.names, Some(request), args)?;
        self.view.respond(request, args)
    }
}
