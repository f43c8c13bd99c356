//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling controlled testing of engine logic.

pub mod clock;
pub mod layer;
pub mod observer;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use observer::{RecordedEvent, RecordingObserver};
