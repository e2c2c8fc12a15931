//! View lifecycle and the container activation primitive.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde_json::{Map, Value};

/// Navigation parameters handed to [`View::on_enter`].
pub type Params = Map<String, Value>;

/// Parameters from a JSON object literal; `None` for anything else.
///
/// ```
/// use pageflow_router::params;
/// use serde_json::json;
///
/// assert_eq!(params(json!({"id": 1})).map(|p| p.len()), Some(1));
/// assert_eq!(params(json!(null)), None);
/// ```
pub fn params(value: Value) -> Option<Params> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// A screen managed by the navigation controller.
///
/// One instance exists per route and is reused across visits until evicted.
pub trait View {
    /// The view became the visible one. `params` are the entry's parameters.
    fn on_enter(&mut self, params: &Params);

    /// The view is about to stop being visible.
    fn on_leave(&mut self);

    /// Data arrived from a background operation. Never called by the controller.
    fn on_data_received(&mut self, _data: &Value) {}
}

/// Views shared with bridge callbacks are registered as `Rc<RefCell<V>>`.
impl<V: View + ?Sized> View for Rc<RefCell<V>> {
    fn on_enter(&mut self, params: &Params) {
        self.borrow_mut().on_enter(params);
    }

    fn on_leave(&mut self) {
        self.borrow_mut().on_leave();
    }

    fn on_data_received(&mut self, data: &Value) {
        self.borrow_mut().on_data_received(data);
    }
}

/// Build a bridge success callback that forwards to `view.on_data_received`.
///
/// The view is held weakly: once it is evicted, deliveries are dropped.
pub fn data_sink<V, T>(view: &Rc<RefCell<V>>) -> impl FnMut(T) + 'static
where
    V: View + 'static,
    T: Serialize,
{
    let view: Weak<RefCell<V>> = Rc::downgrade(view);
    move |data: T| {
        let Some(view) = view.upgrade() else {
            tracing::trace!("Data for an evicted view dropped");
            return;
        };
        match serde_json::to_value(data) {
            Ok(value) => view.borrow_mut().on_data_received(&value),
            Err(error) => tracing::warn!(%error, "View data could not be serialized"),
        }
    }
}

/// The host's show/hide primitive.
pub trait Container {
    /// Make `view` the only visible view.
    fn activate(&mut self, route: &str, view: &dyn View);

    /// The cached view for `route` was dropped.
    fn release(&mut self, _route: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        data: Vec<Value>,
    }

    impl View for Recorder {
        fn on_enter(&mut self, _params: &Params) {}
        fn on_leave(&mut self) {}
        fn on_data_received(&mut self, data: &Value) {
            self.data.push(data.clone());
        }
    }

    #[test]
    fn sink_forwards_serialized_data() {
        let view = Rc::new(RefCell::new(Recorder::default()));
        let mut sink = data_sink(&view);
        sink(vec![1, 2]);
        assert_eq!(view.borrow().data, vec![json!([1, 2])]);
    }

    #[test]
    fn sink_drops_data_for_dropped_view() {
        let view = Rc::new(RefCell::new(Recorder::default()));
        let mut sink = data_sink(&view);
        drop(view);
        sink("late");
    }
}
