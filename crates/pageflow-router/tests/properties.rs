//! Property tests for navigation stack invariants.

use std::rc::Rc;

use pageflow_bridge::{AsyncBridge, BridgeConfig};
use pageflow_router::{
    Container, NavigationController, NavigationError, Params, View, ViewContext,
};
use pageflow_store::ObservableStore;
use proptest::prelude::*;

const ROUTES: [&str; 3] = ["home", "list", "detail"];

struct Blank;

impl View for Blank {
    fn on_enter(&mut self, _params: &Params) {}
    fn on_leave(&mut self) {}
}

struct Headless;

impl Container for Headless {
    fn activate(&mut self, _route: &str, _view: &dyn View) {}
}

fn blank(_: &mut Headless, _: &ViewContext) -> Box<dyn View> {
    Box::new(Blank)
}

fn controller() -> NavigationController<Headless> {
    let bridge = AsyncBridge::new(BridgeConfig::default().with_max_workers(1)).expect("bridge");
    let mut controller =
        NavigationController::new(Headless, ObservableStore::shared(), Rc::new(bridge));
    for route in ROUTES {
        controller.register_route(route, blank, None).expect("register");
    }
    controller
}

#[derive(Debug, Clone)]
enum Op {
    Navigate(&'static str),
    Push(&'static str),
    Pop,
}

fn registered() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(ROUTES.to_vec())
}

fn route() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        4 => registered(),
        1 => Just("unregistered"),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        route().prop_map(Op::Navigate),
        route().prop_map(Op::Push),
        Just(Op::Pop),
    ]
}

fn routes_of(controller: &NavigationController<Headless>) -> Vec<String> {
    controller
        .navigation_stack()
        .into_iter()
        .map(|entry| entry.route_name)
        .collect()
}

proptest! {
    #[test]
    fn pops_match_pushes(
        start in registered(),
        pushes in proptest::collection::vec(registered(), 0..12),
    ) {
        let mut controller = controller();
        controller.navigate(start, None).expect("navigate");
        for route in &pushes {
            controller.push(route, None).expect("push");
        }

        let mut pops = 0;
        while controller.can_pop() {
            prop_assert!(controller.pop());
            pops += 1;
        }

        prop_assert_eq!(pops, pushes.len());
        prop_assert!(!controller.pop());
        prop_assert_eq!(controller.current_route(), Ok(start));
    }

    #[test]
    fn navigate_resets_to_single_entry(
        ops in proptest::collection::vec(op(), 0..20),
        target in registered(),
    ) {
        let mut controller = controller();
        for op in ops {
            match op {
                Op::Navigate(route) => { let _ = controller.navigate(route, None); }
                Op::Push(route) => { let _ = controller.push(route, None); }
                Op::Pop => { controller.pop(); }
            }
        }

        controller.navigate(target, None).expect("navigate");
        prop_assert_eq!(controller.depth(), 1);
        prop_assert_eq!(controller.current_route(), Ok(target));
        prop_assert!(!controller.can_pop());
    }

    #[test]
    fn stack_follows_model(ops in proptest::collection::vec(op(), 0..30)) {
        let mut controller = controller();
        let mut model: Vec<String> = Vec::new();

        for op in ops {
            let before = routes_of(&controller);
            match op {
                Op::Navigate(route) | Op::Push(route) if !ROUTES.contains(&route) => {
                    let result = match op {
                        Op::Navigate(_) => controller.navigate(route, None),
                        _ => controller.push(route, None),
                    };
                    prop_assert_eq!(
                        result,
                        Err(NavigationError::RouteNotFound { name: route.to_string() })
                    );
                    prop_assert_eq!(routes_of(&controller), before);
                }
                Op::Navigate(route) => {
                    controller.navigate(route, None).expect("navigate");
                    model = vec![route.to_string()];
                }
                Op::Push(route) => {
                    controller.push(route, None).expect("push");
                    model.push(route.to_string());
                }
                Op::Pop => {
                    let expected = model.len() > 1;
                    prop_assert_eq!(controller.pop(), expected);
                    if expected {
                        model.pop();
                    }
                }
            }

            prop_assert_eq!(routes_of(&controller), model.clone());
            prop_assert_eq!(controller.active_route(), model.last().map(String::as_str));
        }
    }
}
