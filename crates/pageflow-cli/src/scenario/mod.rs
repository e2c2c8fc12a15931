//! Scripted demo scenarios.
//!
//! Each scenario registers its views on a headless [`Application`], performs
//! the clicks a user would make, and waits for background work between steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use pageflow_bridge::AsyncBridge;
use pageflow_router::{Application, NavigationEntry};
use pageflow_store::Snapshot;

use crate::container::{HeadlessContainer, Transcript};
use crate::settings::Settings;

pub mod quick_start;
pub mod user_management;

/// The application type every scenario runs on.
pub type DemoApp = Application<HeadlessContainer>;

/// Available scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Home, about and counter views sharing a counter in the store.
    QuickStart,
    /// Profiles and posts loaded in the background, settings writing to the store.
    UserManagement,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Self::QuickStart, Self::UserManagement];

    pub fn name(self) -> &'static str {
        match self {
            Self::QuickStart => "quick-start",
            Self::UserManagement => "user-management",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::QuickStart => "Navigate between home, about and counter views",
            Self::UserManagement => "Cached profile and posts fetches with a settings page",
        }
    }

    /// Run the scenario to completion and shut the application down.
    pub fn run(
        self,
        settings: &Settings,
        transcript: Transcript,
    ) -> anyhow::Result<ScenarioReport> {
        tracing::info!(scenario = self.name(), "Scenario started");
        let bridge = AsyncBridge::new(settings.bridge.clone())?;
        let mut app = Application::with_bridge(HeadlessContainer::new(transcript), bridge);
        let backend = Backend::new(settings);

        match self {
            Self::QuickStart => quick_start::run(&mut app)?,
            Self::UserManagement => user_management::run(&mut app, settings, &backend)?,
        }

        let report = ScenarioReport::capture(self, &app, &backend);
        app.shutdown();
        tracing::info!(scenario = self.name(), "Scenario finished");
        Ok(report)
    }
}

/// Simulated remote service shared with worker threads.
#[derive(Debug, Clone)]
pub struct Backend {
    latency: std::time::Duration,
    fetches: Arc<AtomicUsize>,
}

impl Backend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            latency: settings.demo.latency(),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait out the simulated latency and count the call.
    pub(crate) fn round_trip(&self, factor: f32) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.latency.mul_f32(factor));
    }

    /// Number of calls that reached the service.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

/// What a scenario left behind.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub stack: Vec<NavigationEntry>,
    pub store: Snapshot,
    pub transcript: Vec<String>,
    pub fetches: usize,
    pub cached_entries: usize,
    pub activations: usize,
}

impl ScenarioReport {
    fn capture(scenario: Scenario, app: &DemoApp, backend: &Backend) -> Self {
        Self {
            scenario,
            stack: app.controller().navigation_stack(),
            store: app.store().get_all(),
            transcript: app.container().transcript().lines(),
            fetches: backend.fetches(),
            cached_entries: app.bridge().cached_len(),
            activations: app.container().activations(),
        }
    }
}

/// Deliver background results until nothing is outstanding.
pub(crate) fn settle(app: &mut DemoApp, settings: &Settings) -> anyhow::Result<()> {
    if !app.run_until_idle(settings.demo.idle_timeout()) {
        bail!(
            "background work still pending after {}s",
            settings.demo.idle_timeout_secs
        );
    }
    Ok(())
}
