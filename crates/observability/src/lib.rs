//! Tracing/logging setup shared by the binaries and tests.

pub mod subscriber;

pub use subscriber::{DEFAULT_DIRECTIVES, init, init_for_tests, init_with};
