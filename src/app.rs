//! Applications tie configuration, resources and routing together.
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::config::Config;
use crate::manager::Manager;
use crate::render::Renderer;
use crate::request::Request;
use crate::resource::{Bin, Needs, ResourceError};
use crate::response::Response;
use crate::routing::{Mapper, RouteOptions, Router, SimpleMapper};
use crate::view::{Args, View};
use crate::Error;

/// An application.
///
/// Its bin always holds two globals: `"config"` (the [`Config`]) and
/// `"manager"` (the [`Manager`] tracking in-flight requests).
///
/// # Example
/// ```
/// use jbweb::prelude::*;
///
/// let mut app = Application::new();
/// app.route("/", view::from_fn(|_, _| Ok(Response::new("Hello"))), RouteOptions::default());
///
/// let response = app.serve(&Request::new(Url::from_path("/"))).unwrap();
/// assert_eq!(response, Response::new("Hello"));
/// ```
pub struct Application<M: Mapper = SimpleMapper> {
    config: Arc<Config>,
    manager: Arc<Manager>,
    bin: Arc<Bin>,
    router: Router<M>,
}

impl Application<SimpleMapper> {
    pub fn new() -> Self {
        Self::with_router(Router::default())
    }
}

impl Default for Application<SimpleMapper> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Mapper> Application<M> {
    pub fn with_router(router: Router<M>) -> Self {
        let manager = Arc::new(Manager::new());
        let bin = Arc::new(Bin::new(manager.clone()));
        let config = Arc::new(Config::new());
        bin.set_global("config", config.clone());
        bin.set_global("manager", manager.clone());
        Self {
            config,
            manager,
            bin,
            router,
        }
    }

    /// Replace the configuration, rebinding the `"config"` global.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Arc::new(config);
        self.bin.set_global("config", self.config.clone());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub fn bin(&self) -> &Arc<Bin> {
        &self.bin
    }

    pub fn router(&self) -> &Router<M> {
        &self.router
    }

    pub fn route<V: View + 'static>(&mut self, route: &str, view: V, options: RouteOptions) {
        self.router.add(route, view, options);
    }

    pub fn route_rendered<T, F, R>(&mut self, route: &str, view: F, renderer: R, options: RouteOptions)
    where
        T: 'static,
        F: Fn(&Request, Args) -> Result<T, Error> + Send + Sync + 'static,
        R: Renderer<T> + 'static,
    {
        self.router.add_rendered(route, view, renderer, options);
    }

    pub fn provides<T, F>(&self, name: &str, factory: F) -> Result<(), ResourceError>
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<T, Error> + Send + Sync + 'static,
    {
        self.bin.provides(name, factory)
    }

    pub fn provides_with_request<T, F>(&self, name: &str, factory: F) -> Result<(), ResourceError>
    where
        T: Any + Send + Sync,
        F: Fn(&Request) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.bin.provides_with_request(name, factory)
    }

    pub fn needs<V: View>(&self, names: &[&str], view: V) -> Needs<V> {
        self.bin.needs(names, view)
    }

    pub fn after_response<F>(&self, request: &Request, callback: F)
    where
        F: FnOnce(&mut Response) -> Option<Response> + Send + 'static,
    {
        self.manager.after_response(request, callback);
    }

    /// Path of a named route, see [`Mapper::lookup`].
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, Error> {
        Ok(self.router.lookup(name, params)?)
    }

    /// Serve one request from start to finish.
    ///
    /// Request-scoped state is discarded whether or not the view succeeds;
    /// after-response callbacks only run when it does.
    pub fn serve(&self, request: &Request) -> Result<Response, Error> {
        let started = Instant::now();
        self.manager.request_started(request);
        match self.router.route(request) {
            Ok(response) => {
                let response = self.manager.request_served(request, response);
                info!(
                    "{} {} {} {} {}ms",
                    request.method,
                    request.path(),
                    response.status(),
                    response.content_length(),
                    started.elapsed().as_millis()
                );
                Ok(response)
            }
            Err(error) => {
                self.manager.request_failed(request);
                Err(error)
            }
        }
    }
}
