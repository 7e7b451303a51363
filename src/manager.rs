//! Request lifecycle bookkeeping.
//!
//! The manager owns the state scoped to each in-flight request: resources
//! instantiated for it and callbacks to run once its response exists. The
//! state is created when the request starts (or lazily on first use) and
//! dropped when the request is served or fails.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::request::{Request, RequestId};
use crate::resource::Resource;
use crate::response::Response;

/// Runs after a response is produced. It may change the response in place,
/// or return a replacement.
pub type Callback = Box<dyn FnOnce(&mut Response) -> Option<Response> + Send>;

#[derive(Default)]
struct RequestState {
    resources: HashMap<String, Resource>,
    callbacks: Vec<Callback>,
}

#[derive(Default)]
pub struct Manager {
    requests: Mutex<HashMap<RequestId, RequestState>>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    fn requests(&self) -> MutexGuard<'_, HashMap<RequestId, RequestState>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn request_started(&self, request: &Request) {
        debug!("request {} started: {} {}", request.id(), request.method, request.path());
        self.requests().insert(request.id(), RequestState::default());
    }

    /// Run `callback` once the response to `request` is ready.
    pub fn after_response<F>(&self, request: &Request, callback: F)
    where
        F: FnOnce(&mut Response) -> Option<Response> + Send + 'static,
    {
        self.requests()
            .entry(request.id())
            .or_default()
            .callbacks
            .push(Box::new(callback));
    }

    /// Finish a request: drop its scoped state and run its callbacks, in the
    /// order they were added, over the response.
    pub fn request_served(&self, request: &Request, mut response: Response) -> Response {
        // Callbacks run without the lock held so they may use the manager.
        let state = self.requests().remove(&request.id());
        if let Some(state) = state {
            for callback in state.callbacks {
                if let Some(replacement) = callback(&mut response) {
                    response = replacement;
                }
            }
        }
        debug!("request {} served: {}", request.id(), response.status());
        response
    }

    /// Drop the scoped state of a request that produced no response.
    /// Pending callbacks are discarded.
    pub fn request_failed(&self, request: &Request) {
        if let Some(state) = self.requests().remove(&request.id()) {
            warn!(
                "request {} failed, discarding {} resource(s) and {} callback(s)",
                request.id(),
                state.resources.len(),
                state.callbacks.len()
            );
        }
    }

    pub fn is_active(&self, request: &Request) -> bool {
        self.requests().contains_key(&request.id())
    }

    pub fn active_requests(&self) -> usize {
        self.requests().len()
    }

    pub(crate) fn scoped_resource(&self, id: RequestId, name: &str) -> Option<Resource> {
        self.requests()
            .get(&id)
            .and_then(|state| state.resources.get(name))
            .cloned()
    }

    /// Cache a resource for a request. If another instance got there first,
    /// that one is kept and returned.
    pub(crate) fn store_resource(&self, id: RequestId, name: &str, resource: Resource) -> Resource {
        self.requests()
            .entry(id)
            .or_default()
            .resources
            .entry(name.to_string())
            .or_insert(resource)
            .clone()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("active_requests", &self.active_requests())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::Url;
    use std::sync::Arc;

    fn request() -> Request {
        Request::new(Url::from_path("/"))
    }

    #[test]
    fn test_served_evicts_state() {
        let manager = Manager::new();
        let request = request();
        manager.request_started(&request);
        assert!(manager.is_active(&request));
        manager.request_served(&request, Response::default());
        assert!(!manager.is_active(&request));
        assert_eq!(manager.active_requests(), 0);
    }

    #[test]
    fn test_callbacks_run_in_order() {
        let manager = Manager::new();
        let request = request();
        manager.request_started(&request);
        manager.after_response(&request, |response| {
            response.content.extend(b" first");
            None
        });
        manager.after_response(&request, |response| {
            response.content.extend(b" second");
            None
        });
        let response = manager.request_served(&request, Response::new("start"));
        assert_eq!(response.content, b"start first second".to_vec());
    }

    #[test]
    fn test_callback_replaces_response() {
        let manager = Manager::new();
        let request = request();
        manager.request_started(&request);
        manager.after_response(&request, |_| Some(Response::new("replaced").with_code(201)));
        let response = manager.request_served(&request, Response::new("original"));
        assert_eq!(response, Response::new("replaced"));
        assert_eq!(response.code, 201);
    }

    #[test]
    fn test_callbacks_are_per_request() {
        let manager = Manager::new();
        let (first, second) = (request(), request());
        manager.request_started(&first);
        manager.request_started(&second);
        manager.after_response(&first, |_| Some(Response::new("first")));
        let response = manager.request_served(&second, Response::new("second"));
        assert_eq!(response, Response::new("second"));
        assert!(manager.is_active(&first));
    }

    #[test]
    fn test_failed_discards_callbacks() {
        let manager = Manager::new();
        let request = request();
        manager.request_started(&request);
        manager.after_response(&request, |_| Some(Response::new("never")));
        manager.request_failed(&request);
        assert!(!manager.is_active(&request));
        let response = manager.request_served(&request, Response::new("plain"));
        assert_eq!(response, Response::new("plain"));
    }

    #[test]
    fn test_store_keeps_first_instance() {
        let manager = Manager::new();
        let request = request();
        let first: Resource = Arc::new(1u32);
        let second: Resource = Arc::new(2u32);
        let stored = manager.store_resource(request.id(), "n", first.clone());
        assert!(Arc::ptr_eq(&stored, &first));
        let stored = manager.store_resource(request.id(), "n", second);
        assert!(Arc::ptr_eq(&stored, &first));
        assert!(manager.scoped_resource(request.id(), "n").is_some());
        assert!(manager.scoped_resource(request.id(), "other").is_none());
    }
}
