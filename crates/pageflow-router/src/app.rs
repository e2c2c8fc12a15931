//! Application context bundling the controller, store and bridge.

use std::rc::Rc;
use std::time::{Duration, Instant};

use pageflow_bridge::{
    AsyncBridge, BridgeConfig, BridgeError, CachePolicy, TaskError, TaskHandle,
};
use pageflow_store::{ObservableStore, SharedStore};

use crate::controller::NavigationController;
use crate::error::Result;
use crate::navigator::ViewContext;
use crate::view::{Container, Params, View};

/// One window's worth of navigation, state and background work.
///
/// The host drives it by calling [`tick`](Self::tick) once per event-loop
/// iteration, which delivers finished background work and applies navigation
/// requests queued by views.
pub struct Application<C: Container> {
    store: SharedStore,
    bridge: Rc<AsyncBridge>,
    controller: NavigationController<C>,
}

impl<C: Container> Application<C> {
    /// Start a bridge from `config` and wire a fresh store and controller.
    pub fn new(container: C, config: BridgeConfig) -> std::result::Result<Self, BridgeError> {
        Ok(Self::with_bridge(container, AsyncBridge::new(config)?))
    }

    /// Wire an existing bridge, e.g. one built with a test clock.
    pub fn with_bridge(container: C, bridge: AsyncBridge) -> Self {
        let store = ObservableStore::shared();
        let bridge = Rc::new(bridge);
        let controller =
            NavigationController::new(container, Rc::clone(&store), Rc::clone(&bridge));
        Self {
            store,
            bridge,
            controller,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn bridge(&self) -> &Rc<AsyncBridge> {
        &self.bridge
    }

    pub fn controller(&self) -> &NavigationController<C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut NavigationController<C> {
        &mut self.controller
    }

    pub fn container(&self) -> &C {
        self.controller.container()
    }

    pub fn register_route<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
        default_params: Option<Params>,
    ) -> Result<()>
    where
        F: Fn(&mut C, &ViewContext) -> Box<dyn View> + 'static,
    {
        self.controller.register_route(name, factory, default_params)
    }

    pub fn navigate(&mut self, name: &str, params: Option<Params>) -> Result<()> {
        self.controller.navigate(name, params)
    }

    pub fn push(&mut self, name: &str, params: Option<Params>) -> Result<()> {
        self.controller.push(name, params)
    }

    pub fn pop(&mut self) -> bool {
        self.controller.pop()
    }

    pub fn can_pop(&self) -> bool {
        self.controller.can_pop()
    }

    pub fn current_route(&self) -> Result<&str> {
        self.controller.current_route()
    }

    /// See [`AsyncBridge::run_async`].
    pub fn run_async<T, F, S, E>(&self, task: F, on_success: S, on_error: E) -> TaskHandle
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        S: FnMut(T) + 'static,
        E: FnMut(TaskError) + 'static,
    {
        self.bridge.run_async(task, on_success, on_error)
    }

    /// See [`AsyncBridge::run_async_cached`].
    pub fn run_async_cached<T, F, S, E>(
        &self,
        key: impl Into<String>,
        policy: CachePolicy,
        task: F,
        on_success: S,
        on_error: E,
    ) -> TaskHandle
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        S: FnMut(T) + 'static,
        E: FnMut(TaskError) + 'static,
    {
        self.bridge
            .run_async_cached(key, policy, task, on_success, on_error)
    }

    /// One UI tick: deliver queued background results, then apply queued
    /// navigation. Returns the number of items handled.
    pub fn tick(&mut self) -> usize {
        let delivered = self.bridge.process_pending();
        delivered + self.controller.process_requests()
    }

    /// Tick until no delivery or navigation request is outstanding.
    ///
    /// Returns `false` if `timeout` passed first.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let navigator = self.controller.navigator();
        loop {
            self.tick();
            if self.bridge.outstanding() == 0 && navigator.pending() == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.bridge.wait_for_pending(deadline - now);
        }
    }

    /// Release every view, then stop the worker pool.
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
        self.bridge.shutdown();
        tracing::info!("Application shut down");
    }
}

impl<C: Container> std::fmt::Debug for Application<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("store", &self.store)
            .field("bridge", &self.bridge)
            .field("controller", &self.controller)
            .finish()
    }
}
