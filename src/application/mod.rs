//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Bucket store (per-group state with LRU stale eviction)
//! - Quota engine (decision making, fallback cascade, routing)
//! - Metrics (decision and per-quota counters)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod engine;
pub mod metrics;
pub mod ports;
pub mod store;
