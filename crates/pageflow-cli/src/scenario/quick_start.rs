//! Quick start: three views and a counter shared through the store.

use pageflow_router::{Params, View, ViewContext};
use pageflow_store::{SharedStore, SubscriptionId};

use super::DemoApp;
use crate::container::{HeadlessContainer, Transcript};

const COUNT_KEY: &str = "count";

struct HomeView {
    transcript: Transcript,
    store: SharedStore,
    subscription: SubscriptionId,
}

impl HomeView {
    fn new(container: &mut HeadlessContainer, context: &ViewContext) -> Box<dyn View> {
        let transcript = container.transcript().clone();
        let sink = transcript.clone();
        let subscription = context.store().subscribe(COUNT_KEY, move |_, value| {
            sink.line(format!("Home sees count = {value}"));
        });
        Box::new(Self {
            transcript,
            store: context.store().clone(),
            subscription,
        })
    }
}

impl View for HomeView {
    fn on_enter(&mut self, _params: &Params) {
        self.transcript.line("Entered Home");
    }

    fn on_leave(&mut self) {
        self.transcript.line("Left Home");
    }
}

impl Drop for HomeView {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

struct AboutView {
    transcript: Transcript,
}

impl AboutView {
    fn new(container: &mut HeadlessContainer, _context: &ViewContext) -> Box<dyn View> {
        Box::new(Self {
            transcript: container.transcript().clone(),
        })
    }
}

impl View for AboutView {
    fn on_enter(&mut self, _params: &Params) {
        self.transcript.line("Entered About");
    }

    fn on_leave(&mut self) {
        self.transcript.line("Left About");
    }
}

/// Bumps the shared counter on every visit.
struct CounterView {
    transcript: Transcript,
    store: SharedStore,
}

impl CounterView {
    fn new(container: &mut HeadlessContainer, context: &ViewContext) -> Box<dyn View> {
        Box::new(Self {
            transcript: container.transcript().clone(),
            store: context.store().clone(),
        })
    }
}

impl View for CounterView {
    fn on_enter(&mut self, _params: &Params) {
        let count = self.store.get_as::<u64>(COUNT_KEY).unwrap_or(0) + 1;
        self.transcript.line(format!("Entered Counter (visit #{count})"));
        self.store.set(COUNT_KEY, count);
    }

    fn on_leave(&mut self) {}
}

pub(crate) fn run(app: &mut DemoApp) -> anyhow::Result<()> {
    app.register_route("home", HomeView::new, None)?;
    app.register_route("about", AboutView::new, None)?;
    app.register_route("counter", CounterView::new, None)?;

    app.navigate("home", None)?;
    app.push("about", None)?;
    app.pop();
    for _ in 0..2 {
        app.push("counter", None)?;
        app.pop();
    }
    Ok(())
}
