//! The navigation controller: route registry, stack and view lifecycle.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use pageflow_bridge::AsyncBridge;
use pageflow_store::SharedStore;

use crate::error::{NavigationError, Result};
use crate::navigator::{NavRequest, Navigator, ViewContext};
use crate::route::{NavigationEntry, Route};
use crate::view::{Container, Params, View};

/// Owns the routes, the navigation stack and one cached view per route.
///
/// Lives on the UI-owning thread. Every transition runs in this order:
///
/// 1. `on_leave()` on the view being left,
/// 2. the target view is taken from the cache or built by its factory,
/// 3. [`Container::activate`] makes it the only visible view,
/// 4. `on_enter(params)` on the target view.
///
/// Failing operations validate before touching anything, so an error leaves
/// the controller unchanged.
pub struct NavigationController<C: Container> {
    container: C,
    context: ViewContext,
    routes: BTreeMap<String, Route<C>>,
    stack: Vec<NavigationEntry>,
    views: HashMap<String, Box<dyn View>>,
    active: Option<String>,
}

impl<C: Container> NavigationController<C> {
    /// Create a controller with no routes and an empty stack.
    pub fn new(container: C, store: SharedStore, bridge: Rc<AsyncBridge>) -> Self {
        Self {
            container,
            context: ViewContext::new(Navigator::new(), store, bridge),
            routes: BTreeMap::new(),
            stack: Vec::new(),
            views: HashMap::new(),
            active: None,
        }
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    /// The context passed to view factories.
    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    /// A handle for queueing navigation requests.
    pub fn navigator(&self) -> Navigator {
        self.context.navigator().clone()
    }

    // =========================================================================
    // ROUTES
    // =========================================================================

    /// Register `name`, built by `factory` on first activation.
    ///
    /// `default_params` are used by navigate/push calls that pass no params.
    pub fn register_route<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
        default_params: Option<Params>,
    ) -> Result<()>
    where
        F: Fn(&mut C, &ViewContext) -> Box<dyn View> + 'static,
    {
        let name = name.into();
        if self.routes.contains_key(&name) {
            return Err(NavigationError::RouteAlreadyRegistered { name });
        }
        tracing::debug!(route = %name, "Route registered");
        let route = Route::new(name.clone(), Rc::new(factory), default_params);
        self.routes.insert(name, route);
        Ok(())
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Registered route names in sorted order.
    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Replace the stack with a single entry for `name`.
    ///
    /// Params fall back to the route's defaults, then to an empty map.
    pub fn navigate(&mut self, name: &str, params: Option<Params>) -> Result<()> {
        self.apply_navigate(name, params)?;
        self.process_requests();
        Ok(())
    }

    /// Put an entry for `name` on top of the stack.
    pub fn push(&mut self, name: &str, params: Option<Params>) -> Result<()> {
        self.apply_push(name, params)?;
        self.process_requests();
        Ok(())
    }

    /// Go back one entry. Returns `false` when there is nothing to go back to.
    ///
    /// The revealed view is entered again with the params stored in its entry.
    pub fn pop(&mut self) -> bool {
        let popped = self.apply_pop();
        self.process_requests();
        popped
    }

    pub fn can_pop(&self) -> bool {
        self.stack.len() > 1
    }

    /// Name of the route on top of the stack.
    pub fn current_route(&self) -> Result<&str> {
        self.stack
            .last()
            .map(|entry| entry.route_name.as_str())
            .ok_or(NavigationError::EmptyStack)
    }

    /// Params of the entry on top of the stack.
    pub fn current_params(&self) -> Result<&Params> {
        self.stack
            .last()
            .map(|entry| &entry.params)
            .ok_or(NavigationError::EmptyStack)
    }

    /// Copy of the stack, bottom first.
    pub fn navigation_stack(&self) -> Vec<NavigationEntry> {
        self.stack.clone()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Apply navigation requests queued by views, in order.
    ///
    /// A request that fails is logged and skipped. Returns how many were taken
    /// from the queue.
    pub fn process_requests(&mut self) -> usize {
        let navigator = self.navigator();
        let mut applied = 0;
        while let Some(request) = navigator.next() {
            applied += 1;
            let outcome = match &request {
                NavRequest::Navigate { route, params } => {
                    self.apply_navigate(route, params.clone())
                }
                NavRequest::Push { route, params } => self.apply_push(route, params.clone()),
                NavRequest::Pop => {
                    if !self.apply_pop() {
                        tracing::debug!("Queued pop ignored at the root entry");
                    }
                    Ok(())
                }
            };
            if let Err(error) = outcome {
                tracing::warn!(?request, %error, "Queued navigation request failed");
            }
        }
        applied
    }

    // =========================================================================
    // VIEW CACHE
    // =========================================================================

    /// Route whose view is currently visible.
    pub fn active_route(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_route() == Some(name)
    }

    /// Whether a view instance exists for `name`.
    pub fn is_cached(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    /// Drop the cached view for `name` so the next visit builds a new one.
    ///
    /// Returns whether a view was cached. The visible view cannot be evicted.
    pub fn evict(&mut self, name: &str) -> Result<bool> {
        if self.is_active(name) {
            return Err(NavigationError::ViewActive {
                name: name.to_string(),
            });
        }
        if self.views.remove(name).is_none() {
            return Ok(false);
        }
        self.container.release(name);
        tracing::debug!(route = name, "View evicted");
        Ok(true)
    }

    /// Leave the visible view, then drop every cached view and the stack.
    pub fn shutdown(&mut self) {
        self.leave_active();
        self.stack.clear();
        let mut routes: Vec<String> = self.views.drain().map(|(route, _)| route).collect();
        routes.sort();
        for route in &routes {
            self.container.release(route);
        }
        tracing::debug!(released = routes.len(), "Navigation controller shut down");
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    fn apply_navigate(&mut self, name: &str, params: Option<Params>) -> Result<()> {
        let entry = self.entry_for(name, params)?;
        tracing::debug!(route = name, from = ?self.active, "Navigate");
        self.stack.clear();
        self.stack.push(entry);
        self.show_top();
        Ok(())
    }

    fn apply_push(&mut self, name: &str, params: Option<Params>) -> Result<()> {
        let entry = self.entry_for(name, params)?;
        tracing::debug!(route = name, depth = self.stack.len() + 1, "Push");
        self.stack.push(entry);
        self.show_top();
        Ok(())
    }

    fn apply_pop(&mut self) -> bool {
        if !self.can_pop() {
            return false;
        }
        if let Some(left) = self.stack.pop() {
            tracing::debug!(route = %left.route_name, depth = self.stack.len(), "Pop");
        }
        self.show_top();
        true
    }

    fn entry_for(&self, name: &str, params: Option<Params>) -> Result<NavigationEntry> {
        let route = self
            .routes
            .get(name)
            .ok_or_else(|| NavigationError::not_found(name))?;
        Ok(NavigationEntry {
            route_name: name.to_string(),
            params: route.resolve_params(params),
        })
    }

    fn leave_active(&mut self) {
        if let Some(active) = self.active.take()
            && let Some(view) = self.views.get_mut(&active)
        {
            view.on_leave();
        }
    }

    /// Run the leave/activate/enter sequence for the top entry.
    fn show_top(&mut self) {
        let Some(entry) = self.stack.last().cloned() else {
            return;
        };
        self.leave_active();

        let route = entry.route_name.as_str();
        if !self.views.contains_key(route) {
            let Some(definition) = self.routes.get(route) else {
                return;
            };
            let view = definition.build(&mut self.container, &self.context);
            tracing::debug!(route, "View created");
            self.views.insert(entry.route_name.clone(), view);
        }
        let Some(view) = self.views.get_mut(route) else {
            return;
        };
        self.container.activate(route, &**view);
        self.active = Some(entry.route_name.clone());
        view.on_enter(&entry.params);
    }
}

impl<C: Container> fmt::Debug for NavigationController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationController")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("stack", &self.stack)
            .field("active", &self.active)
            .field("cached_views", &self.views.len())
            .finish_non_exhaustive()
    }
}
