//! Observable key/value store for Pageflow applications.
//!
//! The store holds shared application state (`serde_json::Value` per key) and
//! a per-key subscription registry. It lives on the UI-owning thread: the type
//! is `!Send`, and callbacks run synchronously inside [`ObservableStore::set`].
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use pageflow_store::ObservableStore;
//! use serde_json::json;
//!
//! let store = ObservableStore::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&seen);
//! let id = store.subscribe("theme", move |_, value| sink.borrow_mut().push(value.clone()));
//!
//! store.set("theme", "dark");
//! store.unsubscribe(id);
//! store.set("theme", "light");
//!
//! assert_eq!(*seen.borrow(), vec![json!("dark")]);
//! assert_eq!(store.get("theme"), Some(json!("light")));
//! ```

mod store;
mod subscription;

pub use store::{ObservableStore, SharedStore, Snapshot};
pub use subscription::{StoreCallback, SubscriptionId};

pub use serde_json::Value;
