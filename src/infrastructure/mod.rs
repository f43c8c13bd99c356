//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - YAML quota configuration
//! - Clock abstraction (system time vs mock)
//! - Observers (no-op and `tracing`-backed)

pub mod clock;
pub mod config;
pub mod observer;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for testing
/// window, hysteresis and eviction behavior.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// quota-throttle = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
