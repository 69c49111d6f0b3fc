//! Metrics/alarm sink: the renderer seam
//!
//! Rendering (line plots, pressure-volume loops, alarm text) lives outside
//! this crate. A [`MetricsSink`] receives everything a renderer needs:
//! the continuous per-sample trace, per-breath stats records, extrema
//! markers, and alarm events. [`ConsoleSink`] is the built-in
//! implementation that logs instead of drawing.

use crate::breath::alarm::AlarmEvent;
use crate::breath::analyzer::BreathOutput;
use crate::breath::metrics::{Marker, StatsRecord};

/// Consumer of per-sample and per-breath analysis results.
pub trait MetricsSink {
    /// Continuous trace point: converted volume, pressure, and the
    /// baseline-relative volume for pressure-volume loops.
    fn on_sample(&mut self, volume: f64, pressure: f64, relative_volume: Option<f64>);

    /// Per-breath statistics, emitted on phase transitions.
    fn on_stats(&mut self, stats: &StatsRecord);

    /// Overlay marker at a phase extremum.
    fn on_marker(&mut self, marker: &Marker);

    /// Alarm raised by a sample.
    fn on_alarm(&mut self, alarm: &AlarmEvent);

    /// Dispatch one pipeline output to the fine-grained hooks.
    fn consume(&mut self, output: &BreathOutput) {
        self.on_sample(output.volume, output.pressure, output.relative_volume);
        if let Some(marker) = &output.marker {
            self.on_marker(marker);
        }
        if let Some(stats) = &output.stats {
            self.on_stats(stats);
        }
        for alarm in &output.alarms {
            self.on_alarm(alarm);
        }
    }
}

/// Sink that logs stats and alarms through `tracing`.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl MetricsSink for ConsoleSink {
    fn on_sample(&mut self, _volume: f64, _pressure: f64, _relative_volume: Option<f64>) {}

    fn on_stats(&mut self, stats: &StatsRecord) {
        tracing::info!(
            "idx: {}\tRate: {:.2}/min\tTV: {:.2}mL\tPpeak: {:.2}cm\tPEEP: {:.2}cm",
            stats.index,
            stats.respiratory_rate,
            stats.tidal_volume,
            stats.peak_pressure,
            stats.peep
        );
    }

    fn on_marker(&mut self, marker: &Marker) {
        tracing::debug!(
            index = marker.index,
            value = %format!("{:.2}", marker.value),
            kind = ?marker.kind,
            "extremum marker"
        );
    }

    fn on_alarm(&mut self, alarm: &AlarmEvent) {
        tracing::warn!("ALARM: Leakage Warning: {:.2}", alarm.magnitude);
    }
}
