//! Statistics storage and management
//!
//! Stores time-series data for per-breath measurements and alarm events,
//! ready for display by an external renderer.

pub mod store;
