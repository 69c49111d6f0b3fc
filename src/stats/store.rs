//! Time-series storage for per-breath statistics
//!
//! Stores historical per-breath measurements with automatic cleanup of
//! old data, plus an alarm event log and running aggregates.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::breath::alarm::{AlarmEvent, AlarmKind};
use crate::breath::metrics::StatsRecord;

/// Maximum number of per-breath records to keep in history
const MAX_HISTORY_SIZE: usize = 3600; // several hours at typical rates

/// A single per-breath measurement point
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Wall-clock timestamp of the breath
    pub timestamp: DateTime<Utc>,
    /// Value of the measurement
    pub value: f64,
}

/// An alarm occurrence with timestamp
#[derive(Debug, Clone)]
pub struct AlarmLogEntry {
    /// When the alarm was raised
    pub timestamp: DateTime<Utc>,
    /// What kind of alarm
    pub kind: AlarmKind,
    /// Magnitude associated with the alarm (mL for leakage)
    pub magnitude: f64,
}

/// Statistics store for breath-by-breath time-series data
#[derive(Debug)]
pub struct StatsStore {
    /// Respiratory rate history (breaths/min)
    rate_history: VecDeque<Measurement>,
    /// Tidal volume history (mL, leak-compensated)
    tidal_history: VecDeque<Measurement>,
    /// Peak inspiratory pressure history (cm H2O)
    peak_pressure_history: VecDeque<Measurement>,
    /// PEEP history (cm H2O)
    peep_history: VecDeque<Measurement>,
    /// Alarm occurrences
    alarm_log: Vec<AlarmLogEntry>,
    /// Maximum history size
    max_size: usize,
    /// Running statistics
    stats: RunningStats,
}

/// Running statistics calculated from per-breath records
#[derive(Debug, Default, Clone)]
pub struct RunningStats {
    /// Current respiratory rate (breaths/min)
    pub current_rate: f64,
    /// Minimum rate observed (breaths/min)
    pub min_rate: f64,
    /// Maximum rate observed (breaths/min)
    pub max_rate: f64,
    /// Average rate over retained history (breaths/min)
    pub avg_rate: f64,
    /// Current tidal volume (mL)
    pub current_tidal: f64,
    /// Average tidal volume over retained history (mL)
    pub avg_tidal: f64,
    /// Current peak inspiratory pressure (cm H2O)
    pub current_peak_pressure: f64,
    /// Current PEEP (cm H2O)
    pub current_peep: f64,
    /// Latest leak estimate (mL per breath)
    pub current_leak: f64,
    /// Number of completed breaths recorded
    pub breath_count: u64,
    /// Total alarms raised since reset
    pub total_alarms: u64,
    /// Uptime in seconds since monitoring started
    pub uptime_seconds: u64,
    /// Total samples processed by the pipeline
    pub samples_processed: u64,
}

impl StatsStore {
    /// Create a new statistics store
    pub fn new() -> Self {
        Self {
            rate_history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            tidal_history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            peak_pressure_history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            peep_history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            alarm_log: Vec::new(),
            max_size: MAX_HISTORY_SIZE,
            stats: RunningStats {
                min_rate: f64::MAX,
                ..Default::default()
            },
        }
    }

    /// Record the statistics emitted on a completed breath cycle
    pub fn record_breath(&mut self, record: &StatsRecord) {
        let now = Utc::now();

        Self::push_bounded(
            &mut self.rate_history,
            self.max_size,
            Measurement {
                timestamp: now,
                value: record.respiratory_rate,
            },
        );
        Self::push_bounded(
            &mut self.tidal_history,
            self.max_size,
            Measurement {
                timestamp: now,
                value: record.tidal_volume,
            },
        );
        Self::push_bounded(
            &mut self.peak_pressure_history,
            self.max_size,
            Measurement {
                timestamp: now,
                value: record.peak_pressure,
            },
        );
        Self::push_bounded(
            &mut self.peep_history,
            self.max_size,
            Measurement {
                timestamp: now,
                value: record.peep,
            },
        );

        // Update running stats
        self.stats.current_rate = record.respiratory_rate;
        self.stats.current_tidal = record.tidal_volume;
        self.stats.current_peak_pressure = record.peak_pressure;
        self.stats.current_peep = record.peep;
        self.stats.current_leak = record.leak_estimate;
        self.stats.min_rate = self.stats.min_rate.min(record.respiratory_rate);
        self.stats.max_rate = self.stats.max_rate.max(record.respiratory_rate);
        self.stats.breath_count += 1;

        // Recalculate averages over retained history
        let rate_sum: f64 = self.rate_history.iter().map(|m| m.value).sum();
        self.stats.avg_rate = rate_sum / self.rate_history.len() as f64;
        let tidal_sum: f64 = self.tidal_history.iter().map(|m| m.value).sum();
        self.stats.avg_tidal = tidal_sum / self.tidal_history.len() as f64;
    }

    /// Record an alarm occurrence
    pub fn record_alarm(&mut self, alarm: &AlarmEvent) {
        self.alarm_log.push(AlarmLogEntry {
            timestamp: Utc::now(),
            kind: alarm.kind,
            magnitude: alarm.magnitude,
        });
        self.stats.total_alarms += 1;
    }

    /// Count one processed sample
    pub fn add_sample(&mut self) {
        self.stats.samples_processed += 1;
    }

    /// Get respiratory rate history
    pub fn rate_history(&self) -> &VecDeque<Measurement> {
        &self.rate_history
    }

    /// Get tidal volume history
    pub fn tidal_history(&self) -> &VecDeque<Measurement> {
        &self.tidal_history
    }

    /// Get peak pressure history
    pub fn peak_pressure_history(&self) -> &VecDeque<Measurement> {
        &self.peak_pressure_history
    }

    /// Get PEEP history
    pub fn peep_history(&self) -> &VecDeque<Measurement> {
        &self.peep_history
    }

    /// Get alarm log
    pub fn alarm_log(&self) -> &[AlarmLogEntry] {
        &self.alarm_log
    }

    /// Get running statistics
    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    /// Set uptime seconds
    pub fn set_uptime(&mut self, seconds: u64) {
        self.stats.uptime_seconds = seconds;
    }

    /// Clear all history and reset statistics
    pub fn clear(&mut self) {
        self.rate_history.clear();
        self.tidal_history.clear();
        self.peak_pressure_history.clear();
        self.peep_history.clear();
        self.alarm_log.clear();
        self.stats = RunningStats {
            min_rate: f64::MAX,
            ..Default::default()
        };
    }

    /// Reset counters without clearing history
    ///
    /// Resets min/max/avg aggregates and alarm totals but preserves the
    /// graph history data for continued visualization.
    pub fn reset_counters(&mut self) {
        self.stats.min_rate = f64::MAX;
        self.stats.max_rate = 0.0;
        self.stats.avg_rate = 0.0;
        self.stats.avg_tidal = 0.0;
        self.stats.breath_count = 0;
        self.stats.total_alarms = 0;
        self.stats.uptime_seconds = 0;
        self.stats.samples_processed = 0;
    }

    /// Get rate values for plotting (last N points)
    ///
    /// # Returns
    /// Vector of (time_offset_seconds, breaths_per_min) pairs
    pub fn rate_plot_data(&self, count: usize) -> Vec<(f64, f64)> {
        Self::plot_data(&self.rate_history, count)
    }

    /// Get tidal volume values for plotting (last N points)
    ///
    /// # Returns
    /// Vector of (time_offset_seconds, tidal_ml) pairs
    pub fn tidal_plot_data(&self, count: usize) -> Vec<(f64, f64)> {
        Self::plot_data(&self.tidal_history, count)
    }

    fn plot_data(history: &VecDeque<Measurement>, count: usize) -> Vec<(f64, f64)> {
        let now = Utc::now();
        history
            .iter()
            .rev()
            .take(count)
            .map(|m| {
                let time_offset = (now - m.timestamp).num_milliseconds() as f64 / 1000.0;
                (-time_offset, m.value)
            })
            .collect()
    }

    fn push_bounded(history: &mut VecDeque<Measurement>, max: usize, m: Measurement) {
        if history.len() >= max {
            history.pop_front();
        }
        history.push_back(m);
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}
