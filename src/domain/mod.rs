//! Domain layer - quota rules and per-group state.
//!
//! Everything here is clock-free: time is passed in explicitly, which keeps
//! the window and hysteresis logic deterministic under test.

pub mod bucket;
pub mod decision;
pub mod matcher;
pub mod quota;
pub mod record;
