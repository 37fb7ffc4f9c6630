//! Headless multi-step form engine.
//!
//! The crate owns the authoritative state of a multi-step form: it sequences
//! steps, validates each step before moving forward, autosaves answers to a
//! key-value store, collects usage analytics and submits one consolidated JSON
//! payload. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (layout, rules, validation, state
//!   transitions, analytics, review rows). No I/O; time is passed in.
//! - **[`io`]**: Side-effecting adapters (storage, snapshot persistence, HTTP
//!   submission, configuration, clock). Isolated behind traits so tests can
//!   substitute them.
//!
//! Orchestration modules ([`session`], [`submit`], [`view`]) coordinate core
//! logic with I/O. A UI drives a [`session::FormSession`] through its
//! operations and draws [`view::FormView`].

pub mod core;
pub mod error;
pub mod io;
pub mod logging;
pub mod session;
pub mod submit;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod view;
