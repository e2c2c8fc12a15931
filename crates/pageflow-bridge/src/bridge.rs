//! The execution bridge: worker pool, cache and UI-thread delivery.

use std::any::{Any, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tokio::runtime::{Builder, Runtime};

use crate::cache::{CacheEntry, CacheLookup, CacheState, CacheStatus};
use crate::clock::{Clock, SystemClock};
use crate::config::{BridgeConfig, CachePolicy};
use crate::dispatch::{Outcome, Payload, UiHandle, UiMessage};
use crate::error::{Result, TaskError};
use crate::handle::{RequestId, TaskHandle};

/// State shared between the UI thread and the workers.
struct Shared {
    cache: Mutex<CacheState>,
    clock: Arc<dyn Clock>,
    ui: UiHandle,
}

impl Shared {
    fn cache(&self) -> MutexGuard<'_, CacheState> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// UI-side callbacks for one request.
struct Pending {
    cancelled: Arc<AtomicBool>,
    deliver: Box<dyn FnMut(Outcome)>,
}

impl Pending {
    /// Callbacks for an uncached task: the value is moved out of the outcome.
    fn owned<T, S, E>(handle: &TaskHandle, mut on_success: S, mut on_error: E) -> Self
    where
        T: 'static,
        S: FnMut(T) + 'static,
        E: FnMut(TaskError) + 'static,
    {
        Self {
            cancelled: handle.flag(),
            deliver: Box::new(move |outcome| match outcome {
                Outcome::Owned(value) => match value.downcast::<T>() {
                    Ok(value) => on_success(*value),
                    Err(_) => on_error(mismatch::<T>("")),
                },
                Outcome::Shared(_) => on_error(mismatch::<T>("")),
                Outcome::Failed(error) => on_error(error),
            }),
        }
    }

    /// Callbacks for a cached task: the shared value is cloned per delivery.
    fn shared<T, S, E>(
        key: &str,
        handle: &TaskHandle,
        mut on_success: S,
        mut on_error: E,
    ) -> Self
    where
        T: Clone + 'static,
        S: FnMut(T) + 'static,
        E: FnMut(TaskError) + 'static,
    {
        let key = key.to_string();
        Self {
            cancelled: handle.flag(),
            deliver: Box::new(move |outcome| match outcome {
                Outcome::Shared(payload) => match payload.downcast_ref::<T>() {
                    Some(value) => on_success(value.clone()),
                    None => on_error(mismatch::<T>(&key)),
                },
                Outcome::Owned(_) => on_error(mismatch::<T>(&key)),
                Outcome::Failed(error) => on_error(error),
            }),
        }
    }
}

fn mismatch<T>(key: &str) -> TaskError {
    TaskError::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
    }
}

/// Run a task on the current worker thread, converting errors and panics.
fn execute<T, F>(task: F) -> std::result::Result<T, TaskError>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(TaskError::failed(error)),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::error!(%message, "Background task panicked");
            Err(TaskError::Panicked(message))
        }
    }
}

/// Thread-safe bridge between background work and the UI-owning thread.
///
/// Owned by the UI thread (the type is `!Send`). Tasks run on a bounded
/// worker pool; their results come back through a queue that the UI thread
/// drains with [`process_pending`](Self::process_pending), so `on_success`
/// and `on_error` always run on the UI thread and never inline.
pub struct AsyncBridge {
    config: BridgeConfig,
    shared: Arc<Shared>,
    runtime: RefCell<Option<Runtime>>,
    receiver: Receiver<UiMessage>,
    pending: RefCell<HashMap<RequestId, Pending>>,
    next_request: Cell<u64>,
}

impl AsyncBridge {
    /// Start a bridge with the given configuration and the system clock.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Start a bridge with a custom time source.
    pub fn with_clock(config: BridgeConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_workers)
            .thread_name(config.thread_name.clone())
            .build()?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        tracing::debug!(max_workers = config.max_workers, "Execution bridge started");

        Ok(Self {
            config,
            shared: Arc::new(Shared {
                cache: Mutex::new(CacheState::default()),
                clock,
                ui: UiHandle::new(sender),
            }),
            runtime: RefCell::new(Some(runtime)),
            receiver,
            pending: RefCell::new(HashMap::new()),
            next_request: Cell::new(0),
        })
    }

    /// The configuration the bridge was started with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handle for posting work onto the UI thread from any thread.
    pub fn ui_handle(&self) -> UiHandle {
        self.shared.ui.clone()
    }

    /// Run `task` on the worker pool and deliver its result on the UI thread.
    ///
    /// Exactly one of `on_success` / `on_error` is called, during a later
    /// [`process_pending`](Self::process_pending), unless the returned handle
    /// is cancelled first.
    pub fn run_async<T, F, S, E>(&self, task: F, on_success: S, on_error: E) -> TaskHandle
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        S: FnMut(T) + 'static,
        E: FnMut(TaskError) + 'static,
    {
        let handle =
            self.register(|handle| Pending::owned::<T, _, _>(handle, on_success, on_error));
        let request = handle.id();
        let ui = self.shared.ui.clone();
        self.submit(request, move || {
            let outcome = match execute(task) {
                Ok(value) => Outcome::owned(value),
                Err(error) => {
                    tracing::warn!(%request, %error, "Background task failed");
                    Outcome::Failed(error)
                }
            };
            ui.deliver(request, outcome, true);
        });
        handle
    }

    /// Run `task` through the cache for `key`.
    ///
    /// - Fresh entry: delivered without running `task`.
    /// - Fetch outstanding for `key`: this call waits for it instead of
    ///   running `task` again.
    /// - Stale entry with `policy.revalidate`: the stale value is delivered
    ///   first, then the refreshed value in a second delivery.
    /// - Stale entry without revalidation, or no entry: fetched, stored and
    ///   delivered once.
    ///
    /// On failure `on_error` is called once and the entry is left as it was.
    /// A zero TTL still serves fresh entries and stores its result, already
    /// stale, but never joins another caller's fetch.
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
        let key = key.into();
        let handle = self.register(|handle| {
            Pending::shared::<T, _, _>(&key, handle, on_success, on_error)
        });
        let request = handle.id();

        if self.is_shut_down() {
            self.shared
                .ui
                .deliver(request, Outcome::Failed(TaskError::Shutdown), true);
            return handle;
        }

        let now = self.shared.clock.now();
        let mut cache = self.shared.cache();
        match cache.lookup::<T>(&key, now) {
            CacheLookup::Fresh(payload) => {
                drop(cache);
                tracing::debug!(key = %key, %request, "Cache hit");
                self.shared
                    .ui
                    .deliver(request, Outcome::Shared(payload), true);
                return handle;
            }
            CacheLookup::Stale(payload) if policy.revalidate => {
                // Enqueued under the lock, so it precedes the fetch completion.
                tracing::debug!(key = %key, %request, "Serving stale value while revalidating");
                self.shared
                    .ui
                    .deliver(request, Outcome::Shared(payload), false);
            }
            CacheLookup::Stale(_) => {
                tracing::debug!(key = %key, %request, "Cache entry stale");
            }
            CacheLookup::Miss => {
                tracing::debug!(key = %key, %request, "Cache miss");
            }
        }

        // A zero TTL always fetches for itself.
        if !policy.ttl.is_zero() && cache.join(&key, request) {
            tracing::debug!(key = %key, %request, "Joined outstanding fetch");
            return handle;
        }
        let fetch = cache.begin(&key, request, policy.ttl);
        drop(cache);

        let shared = Arc::clone(&self.shared);
        self.submit(request, move || {
            let result = execute(task).map(|value| Arc::new(value) as Payload);
            let waiters = {
                let now = shared.clock.now();
                shared.cache().complete(fetch, result.as_ref().ok(), now)
            };
            match &result {
                Ok(_) => tracing::debug!(key = %key, waiters = waiters.len(), "Fetch complete"),
                Err(error) => {
                    tracing::warn!(key = %key, waiters = waiters.len(), %error, "Fetch failed");
                }
            }
            for waiter in waiters {
                shared.ui.deliver(waiter, Outcome::shared(&result), true);
            }
        });
        handle
    }

    /// Drop any cached value for `key`, whatever its status.
    ///
    /// A fetch already running for `key` still delivers to its waiters but
    /// does not store its result, and later requests start a new fetch.
    pub fn invalidate(&self, key: &str) {
        if self.shared.cache().invalidate(key) {
            tracing::debug!(key, "Cache entry invalidated");
        }
    }

    /// Drop every cached value.
    pub fn invalidate_all(&self) {
        let removed = self.shared.cache().invalidate_all();
        tracing::debug!(removed, "Cache cleared");
    }

    /// Current status of `key`; `None` when nothing is stored or fetching.
    pub fn cache_status(&self, key: &str) -> Option<CacheStatus> {
        let now = self.shared.clock.now();
        self.shared.cache().status(key, now)
    }

    /// Fresh cached value for `key`, if any.
    pub fn get_cached<T: Any + Clone>(&self, key: &str) -> Option<T> {
        let now = self.shared.clock.now();
        let cache = self.shared.cache();
        let entry = cache.entry(key)?;
        if entry.status(now) != CacheStatus::Fresh {
            return None;
        }
        entry.value::<T>().cloned()
    }

    /// Copy of the stored entry for `key`, fresh or stale.
    pub fn cache_entry(&self, key: &str) -> Option<CacheEntry> {
        self.shared.cache().entry(key).cloned()
    }

    /// Number of stored cache entries.
    pub fn cached_len(&self) -> usize {
        self.shared.cache().len()
    }

    /// Number of requests still waiting for a delivery.
    pub fn outstanding(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Run everything queued for the UI thread at the time of the call.
    ///
    /// Work enqueued while draining waits for the next call. Returns the
    /// number of queue items handled.
    pub fn process_pending(&self) -> usize {
        let queued = self.receiver.len();
        let mut handled = 0;
        for _ in 0..queued {
            match self.receiver.try_recv() {
                Ok(message) => {
                    self.dispatch(message);
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        handled
    }

    /// Block up to `timeout` for queued work, then drain the queue.
    pub fn wait_for_pending(&self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => {
                self.dispatch(message);
                1 + self.process_pending()
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Drain deliveries until no request is outstanding or `timeout` passes.
    ///
    /// Returns `true` if every request was settled.
    pub fn run_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_pending();
            if self.outstanding() == 0 && self.receiver.is_empty() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait_for_pending(deadline - now);
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.runtime.borrow().is_none()
    }

    /// Stop accepting tasks and wait for running ones to finish.
    ///
    /// Deliveries produced by those tasks stay queued for
    /// [`process_pending`](Self::process_pending). Requests whose task never
    /// started are failed with [`TaskError::Shutdown`] behind them.
    pub fn shutdown(&self) {
        let runtime = self.runtime.borrow_mut().take();
        let Some(runtime) = runtime else {
            return;
        };
        drop(runtime);

        let abandoned = self.shared.cache().abandon_fetches();
        let mut requests: Vec<RequestId> = self.pending.borrow().keys().copied().collect();
        requests.sort_unstable();
        for request in requests {
            self.shared
                .ui
                .deliver(request, Outcome::Failed(TaskError::Shutdown), true);
        }
        tracing::debug!(abandoned, "Execution bridge shut down");
    }

    fn register(&self, build: impl FnOnce(&TaskHandle) -> Pending) -> TaskHandle {
        let id = self.next_request.get() + 1;
        self.next_request.set(id);
        let handle = TaskHandle::new(RequestId(id));
        self.pending.borrow_mut().insert(handle.id(), build(&handle));
        handle
    }

    fn submit(&self, request: RequestId, job: impl FnOnce() + Send + 'static) {
        match self.runtime.borrow().as_ref() {
            Some(runtime) => {
                // The join handle is not needed: the job reports through the queue.
                drop(runtime.spawn_blocking(job));
            }
            None => {
                self.shared
                    .ui
                    .deliver(request, Outcome::Failed(TaskError::Shutdown), true);
            }
        }
    }

    fn dispatch(&self, message: UiMessage) {
        match message {
            UiMessage::Run(work) => work(),
            UiMessage::Deliver {
                request,
                outcome,
                last,
            } => {
                let Some(mut pending) = self.pending.borrow_mut().remove(&request) else {
                    tracing::trace!(%request, "Delivery for unknown request dropped");
                    return;
                };
                if pending.cancelled.load(Ordering::Acquire) {
                    tracing::trace!(%request, "Delivery suppressed by cancellation");
                } else {
                    // No borrow is held here, so callbacks may re-enter the bridge.
                    (pending.deliver)(outcome);
                }
                if !last {
                    self.pending.borrow_mut().insert(request, pending);
                }
            }
        }
    }
}

impl std::fmt::Debug for AsyncBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncBridge")
            .field("config", &self.config)
            .field("outstanding", &self.outstanding())
            .field("queued", &self.receiver.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
