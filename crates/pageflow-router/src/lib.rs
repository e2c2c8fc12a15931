//! Navigation stack and view lifecycle for Pageflow applications.
//!
//! A [`NavigationController`] keeps a stack of [`NavigationEntry`] values and
//! one cached [`View`] per registered route. Every transition calls
//! `on_leave` on the view being left, asks the host's [`Container`] to show
//! the target, then calls `on_enter` on it.
//!
//! [`Application`] bundles the controller with the shared store and the
//! execution bridge so a host only has to call [`Application::tick`] from its
//! event loop.
//!
//! # Example
//!
//! ```
//! use pageflow_bridge::BridgeConfig;
//! use pageflow_router::{Application, Container, Params, View, ViewContext, params};
//! use serde_json::json;
//!
//! struct Screen;
//!
//! impl View for Screen {
//!     fn on_enter(&mut self, _params: &Params) {}
//!     fn on_leave(&mut self) {}
//! }
//!
//! struct Headless;
//!
//! impl Container for Headless {
//!     fn activate(&mut self, _route: &str, _view: &dyn View) {}
//! }
//!
//! fn screen(_: &mut Headless, _: &ViewContext) -> Box<dyn View> {
//!     Box::new(Screen)
//! }
//!
//! let mut app = Application::new(Headless, BridgeConfig::default())?;
//! app.register_route("home", screen, None)?;
//! app.register_route("profile", screen, None)?;
//!
//! app.navigate("home", None)?;
//! app.push("profile", params(json!({"id": 1})))?;
//! assert_eq!(app.current_route()?, "profile");
//!
//! assert!(app.pop());
//! assert_eq!(app.current_route()?, "home");
//! assert!(!app.pop());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod app;
mod controller;
pub mod error;
mod navigator;
mod route;
mod view;

pub use app::Application;
pub use controller::NavigationController;
pub use error::{NavigationError, Result};
pub use navigator::{NavRequest, Navigator, ViewContext};
pub use route::{NavigationEntry, Route, ViewFactory};
pub use view::{Container, Params, View, data_sink, params};
