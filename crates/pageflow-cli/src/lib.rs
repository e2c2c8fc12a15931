//! Headless host for the Pageflow demo applications.

pub mod cli;
pub mod container;
pub mod logging;
pub mod scenario;
pub mod settings;
pub mod summary;
