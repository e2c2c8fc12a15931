//! The observable store.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::subscription::{Registry, StoreCallback, SubscriptionId};

/// Copy of the whole store contents, ordered by key.
pub type Snapshot = BTreeMap<String, Value>;

/// Store handle as injected into the navigation controller and every view.
pub type SharedStore = Rc<ObservableStore>;

/// Mutable key/value map with per-key subscribers.
///
/// All methods take `&self`, so one instance can be shared through
/// [`SharedStore`] and re-entered from inside its own callbacks.
#[derive(Default)]
pub struct ObservableStore {
    state: RefCell<Snapshot>,
    registry: RefCell<Registry>,
}

impl ObservableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind an `Rc`.
    pub fn shared() -> SharedStore {
        Rc::new(Self::new())
    }

    /// Get the stored value for `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.borrow().get(key).cloned()
    }

    /// Get the stored value for `key`, or `default` if absent.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Get the stored value for `key` deserialized into `T`.
    ///
    /// Returns `None` if the key is absent or holds an incompatible value.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(error) => {
                tracing::debug!(key, %error, "Stored value has unexpected shape");
                None
            }
        }
    }

    /// Whether `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.state.borrow().contains_key(key)
    }

    /// Store `value` under `key`, then notify the key's subscribers in
    /// subscription order before returning.
    ///
    /// Subscribers see the store already updated. Subscribers added during
    /// the round are not called for it; subscribers removed during the round
    /// are still called for it.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.state.borrow_mut().insert(key.clone(), value.clone());

        let round = self.registry.borrow().round(&key);
        tracing::trace!(key = %key, subscribers = round.len(), "Store value set");
        for callback in round {
            callback(&key, &value);
        }
    }

    /// Apply [`set`](Self::set) to each pair in iteration order.
    ///
    /// Each key gets its own notification round.
    pub fn update<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Register `callback` for changes to `key`.
    pub fn subscribe<F>(&self, key: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&str, &Value) + 'static,
    {
        let callback: Rc<StoreCallback> = Rc::new(callback);
        self.registry.borrow_mut().insert(key.into(), callback)
    }

    /// Remove a subscription.
    ///
    /// Returns `false` if the handle was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.borrow_mut().remove(id);
        if let Some(key) = &removed {
            tracing::trace!(%id, key = %key, "Store subscription removed");
        }
        removed.is_some()
    }

    /// Number of live subscriptions on `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.registry.borrow().count(key)
    }

    /// Remove every key. Subscribers are kept and not notified.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.state.borrow_mut());
        tracing::debug!(
            keys = removed.len(),
            subscriptions = self.registry.borrow().total(),
            "Store cleared"
        );
    }

    /// Copy of all stored values.
    pub fn get_all(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }
}

impl std::fmt::Debug for ObservableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableStore")
            .field("state", &self.state.borrow())
            .field("subscriptions", &self.registry.borrow().total())
            .finish()
    }
}
