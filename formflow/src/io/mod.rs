//! I/O adapters for the form engine.

pub mod clock;
pub mod config;
pub mod snapshot;
pub mod store;
pub mod submitter;
