//! Breathwatch - Online breath-cycle detection and ventilation metrics
//!
//! This library provides the core functionality for monitoring a breathing
//! circuit from a stream of volume/pressure sensor samples. It segments the
//! stream into inspiratory and expiratory phases, estimates respiratory
//! rate, tidal volume, pressures, and leak, and raises safety alarms.

pub mod breath;
pub mod config;
pub mod sink;
pub mod source;
pub mod stats;

pub use breath::alarm::{AlarmEvent, AlarmKind};
pub use breath::analyzer::{BreathAnalyzer, BreathOutput};
pub use breath::metrics::{Marker, MarkerKind, StatsRecord};
pub use breath::{Phase, Sample};
pub use config::AnalyzerConfig;
pub use sink::{ConsoleSink, MetricsSink};
pub use source::replay::ReplaySource;
pub use source::{SampleSource, SourceError};
pub use stats::store::StatsStore;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
