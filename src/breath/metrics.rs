//! Per-breath metrics estimation
//!
//! Updates the live [`BreathRecord`] on each phase-transition edge using
//! single-pole exponential moving averages for respiratory rate and tidal
//! volume, plus a baseline-drift leak estimate. Each field of the record
//! is owned by exactly one transition: inspiratory start updates the
//! expiratory bookkeeping and the rate, expiratory start updates peak
//! pressure and tidal volume.

use super::extrema::ExtremaTracker;

/// Per-breath statistics emitted on phase transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsRecord {
    /// Index of the sample that triggered the transition
    pub index: u64,
    /// Smoothed respiratory rate in breaths/min
    pub respiratory_rate: f64,
    /// Leak-compensated tidal volume in mL (EMA minus half the leak)
    pub tidal_volume: f64,
    /// Peak inspiratory pressure in cmH2O
    pub peak_pressure: f64,
    /// Positive end-expiratory pressure in cmH2O
    pub peep: f64,
    /// Expiratory baseline drift across consecutive breaths in mL
    pub leak_estimate: f64,
}

/// Category of a plot/debug marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Volume trough that ended an expiration
    ExpiratoryMin,
    /// Volume peak that ended an inspiration
    InspiratoryMax,
}

/// A marker at a phase extremum, for overlay plotting.
///
/// `value` is relative to the expiratory baseline when one is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub index: u64,
    pub value: f64,
    pub kind: MarkerKind,
}

/// The single live record of breath-derived quantities.
///
/// `tidal_volume` and `respiratory_rate` hold 0 until the first full cycle
/// completes; optional fields are `None` until the transition that owns
/// them has fired at least once.
#[derive(Debug, Clone, Default)]
pub struct BreathRecord {
    /// Volume at the most recent expiratory trough (the baseline)
    pub expiratory_volume: Option<f64>,
    /// Baseline of the breath before that
    pub expiratory_volume_prev: Option<f64>,
    /// Timestamp of the most recent expiratory trough
    pub expiratory_timestamp: Option<f64>,
    /// Timestamp of the trough before that
    pub expiratory_timestamp_prev: Option<f64>,
    /// Timestamp of the most recent inspiratory peak
    pub inspiratory_timestamp: Option<f64>,
    /// Peak inspiratory pressure of the last completed inspiration
    pub peak_pressure: f64,
    /// Pressure floor of the last completed expiration
    pub peep: f64,
    /// Smoothed tidal volume (EMA, uncompensated)
    pub tidal_volume: f64,
    /// Smoothed respiratory rate in breaths/min (EMA)
    pub respiratory_rate: f64,
    /// Signed expiratory baseline drift of the last breath pair
    pub leak_estimate: f64,
}

/// Outcome of an expiratory-start edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiratoryOutcome {
    /// The edge was noise; the phase was reverted to Inspiratory and the
    /// remaining steps were skipped for this sample
    pub reverted: bool,
    pub stats: Option<StatsRecord>,
    pub marker: Option<Marker>,
}

/// EMA-based estimator driven by phase-transition edges.
#[derive(Debug)]
pub struct MetricsEstimator {
    record: BreathRecord,
    /// EMA retention factor for the respiratory rate
    rate_smoothing: f64,
    /// EMA retention factor for the tidal volume
    vol_tidal_smoothing: f64,
    /// Volume excursion below which an expiratory edge is noise, in mL
    minimum_volume_breath: f64,
}

impl MetricsEstimator {
    pub fn new(rate_smoothing: f64, vol_tidal_smoothing: f64, minimum_volume_breath: f64) -> Self {
        Self {
            record: BreathRecord::default(),
            rate_smoothing,
            vol_tidal_smoothing,
            minimum_volume_breath,
        }
    }

    /// The live breath record.
    pub fn record(&self) -> &BreathRecord {
        &self.record
    }

    /// Current expiratory baseline volume, if one has been established.
    pub fn expiratory_volume(&self) -> Option<f64> {
        self.record.expiratory_volume
    }

    /// Handle an inspiratory-start edge.
    ///
    /// Reads PEEP from the pressure floor of the expiration that just
    /// ended, shifts the expiratory baseline bookkeeping, updates leak and
    /// respiratory-rate estimates, and arms the tracker for the new
    /// inspiration's volume peak.
    pub fn on_inspiratory_start(
        &mut self,
        extrema: &mut ExtremaTracker,
        index: u64,
    ) -> (Option<StatsRecord>, Option<Marker>) {
        if let Some(pressure_floor) = extrema.min_pressure() {
            self.record.peep = pressure_floor;
        }
        extrema.reset_min_pressure();

        let mut stats = None;
        let mut marker = None;

        if let Some(trough) = extrema.min_volume() {
            // Marker is relative to the outgoing baseline, before the shift
            marker = Some(Marker {
                index: trough.index,
                value: match self.record.expiratory_volume {
                    Some(baseline) => trough.value - baseline,
                    None => trough.value,
                },
                kind: MarkerKind::ExpiratoryMin,
            });

            self.record.expiratory_timestamp_prev = self.record.expiratory_timestamp;
            self.record.expiratory_timestamp = Some(trough.timestamp);
            self.record.expiratory_volume_prev = self.record.expiratory_volume;
            self.record.expiratory_volume = Some(trough.value);

            if let (Some(volume), Some(volume_prev)) = (
                self.record.expiratory_volume,
                self.record.expiratory_volume_prev,
            ) {
                self.record.leak_estimate = volume - volume_prev;
            }

            if let (Some(ts), Some(ts_prev)) = (
                self.record.expiratory_timestamp,
                self.record.expiratory_timestamp_prev,
            ) {
                let dt = ts - ts_prev;
                if dt > 0.0 {
                    self.record.respiratory_rate = self.record.respiratory_rate
                        * self.rate_smoothing
                        + (1.0 - self.rate_smoothing) * (60.0 / dt);
                } else {
                    tracing::warn!(dt, "degenerate breath interval, rate update skipped");
                }
            }

            stats = Some(self.stats_record(index));
        }

        extrema.reset_max_volume();

        (stats, marker)
    }

    /// Handle an expiratory-start edge.
    ///
    /// Reads peak pressure from the inspiration that just ended, then
    /// applies the minimum-breath guard: if the current volume has not
    /// risen at least `minimum_volume_breath` above the expiratory
    /// baseline, the edge is noise and the caller must revert the phase.
    /// Peak pressure is taken before the guard, matching the edge window
    /// used for the pressure maximum. The guard is skipped for `forced`
    /// edges: a backup-rate cycle is synthetic by construction and must
    /// not be discarded as noise.
    pub fn on_expiratory_start(
        &mut self,
        extrema: &mut ExtremaTracker,
        current_volume: f64,
        index: u64,
        forced: bool,
    ) -> ExpiratoryOutcome {
        if let Some(pressure_peak) = extrema.max_pressure() {
            self.record.peak_pressure = pressure_peak;
        }
        extrema.reset_max_pressure();

        if !forced {
            if let Some(baseline) = self.record.expiratory_volume {
                if current_volume < baseline + self.minimum_volume_breath {
                    return ExpiratoryOutcome {
                        reverted: true,
                        ..Default::default()
                    };
                }
            }
        }

        let mut outcome = ExpiratoryOutcome::default();

        if let Some(peak) = extrema.max_volume() {
            outcome.marker = Some(Marker {
                index: peak.index,
                value: match self.record.expiratory_volume {
                    Some(baseline) => peak.value - baseline,
                    None => peak.value,
                },
                kind: MarkerKind::InspiratoryMax,
            });
        }

        if let (Some(peak), Some(trough)) = (extrema.max_volume(), extrema.min_volume()) {
            self.record.tidal_volume = self.vol_tidal_smoothing * self.record.tidal_volume
                + (1.0 - self.vol_tidal_smoothing) * (peak.value - trough.value);
            self.record.inspiratory_timestamp = Some(peak.timestamp);
            outcome.stats = Some(self.stats_record(index));
        }

        extrema.reset_min_volume();

        outcome
    }

    fn stats_record(&self, index: u64) -> StatsRecord {
        StatsRecord {
            index,
            respiratory_rate: self.record.respiratory_rate,
            tidal_volume: self.record.tidal_volume - self.record.leak_estimate / 2.0,
            peak_pressure: self.record.peak_pressure,
            peep: self.record.peep,
            leak_estimate: self.record.leak_estimate,
        }
    }
}
