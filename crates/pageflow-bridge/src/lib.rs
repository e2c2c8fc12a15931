//! Background task execution with TTL caching for Pageflow applications.
//!
//! [`AsyncBridge`] runs closures on a bounded worker pool and hands their
//! results back to the single UI-owning thread through a queue. Cached
//! requests are de-duplicated per key and support stale-while-revalidate.
//!
//! # Threading
//!
//! - Tasks run on worker threads and must be `Send`.
//! - `on_success` / `on_error` run on the UI thread, inside
//!   [`AsyncBridge::process_pending`], and need not be `Send`.
//! - [`UiHandle`] lets any thread post closures onto the same queue.
//!
//! # Usage
//!
//! ```ignore
//! let bridge = AsyncBridge::new(BridgeConfig::default())?;
//! bridge.run_async_cached(
//!     "user_1",
//!     CachePolicy::seconds(300).revalidate(),
//!     || fetch_user(1),
//!     move |user| view.borrow_mut().show(user),
//!     |error| tracing::warn!(%error, "Could not load user"),
//! );
//! // once per UI tick:
//! bridge.process_pending();
//! ```

mod bridge;
pub mod cache;
pub mod clock;
pub mod config;
mod dispatch;
pub mod error;
mod handle;

pub use bridge::AsyncBridge;
pub use cache::{CacheEntry, CacheStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BridgeConfig, CachePolicy};
pub use dispatch::UiHandle;
pub use error::{BridgeError, TaskError};
pub use handle::{RequestId, TaskHandle};
