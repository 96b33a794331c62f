//! CLI library components for the form pack exporter.

pub mod logging;
pub mod pipeline;
