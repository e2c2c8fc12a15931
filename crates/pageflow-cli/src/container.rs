//! A windowless container: shows views by writing to a transcript.

use std::cell::RefCell;
use std::rc::Rc;

use pageflow_router::{Container, View};

/// Lines the views have "drawn", in order.
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Rc<RefCell<Vec<String>>>,
    echo: bool,
}

impl Transcript {
    /// A transcript that also prints every line to stdout.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn line(&self, text: impl Into<String>) {
        let text = text.into();
        if self.echo {
            println!("{text}");
        }
        self.lines.borrow_mut().push(text);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lines.borrow().iter().any(|line| line == text)
    }
}

/// Container for running views without a window system.
#[derive(Debug, Default)]
pub struct HeadlessContainer {
    transcript: Transcript,
    visible: Option<String>,
    activations: usize,
    released: Vec<String>,
}

impl HeadlessContainer {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            ..Self::default()
        }
    }

    /// The transcript views should draw into.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Route whose view is currently shown.
    pub fn visible(&self) -> Option<&str> {
        self.visible.as_deref()
    }

    pub fn activations(&self) -> usize {
        self.activations
    }

    /// Routes whose views were dropped, in order.
    pub fn released(&self) -> &[String] {
        &self.released
    }
}

impl Container for HeadlessContainer {
    fn activate(&mut self, route: &str, _view: &dyn View) {
        tracing::info!(route, "View shown");
        self.activations += 1;
        self.visible = Some(route.to_string());
        self.transcript.line(format!("[{route}]"));
    }

    fn release(&mut self, route: &str) {
        tracing::debug!(route, "View released");
        if self.visible.as_deref() == Some(route) {
            self.visible = None;
        }
        self.released.push(route.to_string());
    }
}
