//! Deterministic, pure logic shared by the form engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and take the current time as an argument.

pub mod analytics;
pub mod debounce;
pub mod layout;
pub mod reference;
pub mod review;
pub mod rules;
pub mod state;
pub mod types;
pub mod validator;
