//! Helpers for testing the service.
//!
//! In every test, call [`setup`]. This will set up the logger so that all
//! console output is captured by the test runner.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from this crate and
///    mutes all others.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("wayfinder_service=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}
