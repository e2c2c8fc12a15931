//! Subscription registry types.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// Callback invoked with `(key, value)` after every `set` on a watched key.
pub type StoreCallback = dyn Fn(&str, &Value);

/// Opaque handle returned by [`ObservableStore::subscribe`].
///
/// Only useful with [`ObservableStore::unsubscribe`]. Handles are never reused
/// within one store.
///
/// [`ObservableStore::subscribe`]: crate::ObservableStore::subscribe
/// [`ObservableStore::unsubscribe`]: crate::ObservableStore::unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

struct Subscriber {
    id: SubscriptionId,
    callback: Rc<StoreCallback>,
}

/// Per-key ordered subscriber lists plus a reverse index for removal by id.
#[derive(Default)]
pub(crate) struct Registry {
    by_key: HashMap<String, Vec<Subscriber>>,
    key_of: HashMap<SubscriptionId, String>,
    next_id: u64,
}

impl Registry {
    pub(crate) fn insert(&mut self, key: String, callback: Rc<StoreCallback>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.key_of.insert(id, key.clone());
        self.by_key
            .entry(key)
            .or_default()
            .push(Subscriber { id, callback });
        id
    }

    /// Removes a subscriber. Returns the key it was watching.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> Option<String> {
        let key = self.key_of.remove(&id)?;
        if let Some(list) = self.by_key.get_mut(&key) {
            list.retain(|subscriber| subscriber.id != id);
            if list.is_empty() {
                self.by_key.remove(&key);
            }
        }
        Some(key)
    }

    /// Callbacks for one notification round, in subscription order.
    ///
    /// The returned list is detached from the registry, so callbacks may
    /// subscribe or unsubscribe while the round runs.
    pub(crate) fn round(&self, key: &str) -> Vec<Rc<StoreCallback>> {
        self.by_key
            .get(key)
            .map(|list| {
                list.iter()
                    .map(|subscriber| Rc::clone(&subscriber.callback))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.by_key.get(key).map_or(0, Vec::len)
    }

    pub(crate) fn total(&self) -> usize {
        self.key_of.len()
    }
}
