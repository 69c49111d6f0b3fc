//! Breath-cycle detection and per-breath metrics
//!
//! This module contains the online analysis pipeline:
//! - Volume unit conversion ([`units`])
//! - Per-phase running extrema ([`extrema`])
//! - Inspiratory/expiratory phase state machine ([`phase`])
//! - EMA estimators for rate, tidal volume, and leak ([`metrics`])
//! - Leakage alarm evaluation ([`alarm`])
//! - The per-sample orchestrator ([`analyzer`])

pub mod alarm;
pub mod analyzer;
pub mod extrema;
pub mod metrics;
pub mod phase;
pub mod units;

/// A single timestamped sensor reading from the breathing circuit.
///
/// Produced by a [`crate::source::SampleSource`]; immutable once created.
/// Timestamps are assumed monotonically non-decreasing; the backup-rate
/// timer in [`phase::PhaseDetector`] depends on this.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Acquisition time in seconds
    pub timestamp: f64,
    /// Raw volume counts (signed), converted to mL by [`units::to_milliliters`]
    pub volume: f64,
    /// Airway pressure in cmH2O
    pub pressure: f64,
}

/// Breathing phase. Exactly one value is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Volume rising (air moving into the circuit)
    Inspiratory,
    /// Volume falling (air moving out of the circuit)
    Expiratory,
}
