//! Integration test infrastructure for Gantry CI.
//!
//! In-memory port implementations for fast cross-crate tests, plus a
//! testcontainers PostgreSQL harness for the database-backed tests gated
//! behind the `integration` feature.

pub mod containers;
pub mod context;
pub mod fixtures;

pub use context::TestContext;
pub use fixtures::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .with_test_writer()
        .try_init();
}
