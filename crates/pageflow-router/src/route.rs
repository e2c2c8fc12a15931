//! Route registry records and navigation stack entries.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::navigator::ViewContext;
use crate::view::{Params, View};

/// Builds the view for a route on first activation.
pub type ViewFactory<C> = Rc<dyn Fn(&mut C, &ViewContext) -> Box<dyn View>>;

/// A registered route.
pub struct Route<C> {
    name: String,
    factory: ViewFactory<C>,
    default_params: Option<Params>,
}

impl<C> Route<C> {
    pub(crate) fn new(
        name: String,
        factory: ViewFactory<C>,
        default_params: Option<Params>,
    ) -> Self {
        Self {
            name,
            factory,
            default_params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_params(&self) -> Option<&Params> {
        self.default_params.as_ref()
    }

    /// `params`, else the route's defaults, else an empty map.
    pub(crate) fn resolve_params(&self, params: Option<Params>) -> Params {
        params
            .or_else(|| self.default_params.clone())
            .unwrap_or_default()
    }

    pub(crate) fn build(&self, container: &mut C, context: &ViewContext) -> Box<dyn View> {
        (self.factory)(container, context)
    }
}

impl<C> fmt::Debug for Route<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("default_params", &self.default_params)
            .finish_non_exhaustive()
    }
}

/// One entry of the navigation stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationEntry {
    pub route_name: String,
    pub params: Params,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Blank;

    impl View for Blank {
        fn on_enter(&mut self, _params: &Params) {}
        fn on_leave(&mut self) {}
    }

    fn route(default_params: Option<Params>) -> Route<()> {
        Route::new(
            "r".into(),
            Rc::new(|_: &mut (), _: &ViewContext| Box::new(Blank) as Box<dyn View>),
            default_params,
        )
    }

    fn params(value: serde_json::Value) -> Params {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn explicit_params_win_over_defaults() {
        let route = route(Some(params(json!({"tab": "info"}))));
        let resolved = route.resolve_params(Some(params(json!({"id": 1}))));
        assert_eq!(resolved, params(json!({"id": 1})));
    }

    #[test]
    fn defaults_then_empty() {
        assert_eq!(
            route(Some(params(json!({"tab": "info"})))).resolve_params(None),
            params(json!({"tab": "info"}))
        );
        assert!(route(None).resolve_params(None).is_empty());
    }
}
