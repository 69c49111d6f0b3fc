//! Per-sample analysis pipeline
//!
//! [`BreathAnalyzer`] owns every piece of mutable analysis state (extrema,
//! phase, EMA accumulators, the breath record) and drives the pipeline for
//! each sample: convert units, track extrema, detect the phase, run the
//! estimator branch on a transition edge, then evaluate alarms. Samples
//! are processed to completion one at a time; there is no lookahead.

use super::alarm::{AlarmEvaluator, AlarmEvent};
use super::extrema::ExtremaTracker;
use super::metrics::{BreathRecord, Marker, MetricsEstimator, StatsRecord};
use super::phase::{PhaseDetector, PhaseEdge};
use super::{units, Phase, Sample};
use crate::config::AnalyzerConfig;

/// Everything the pipeline derived from a single sample.
#[derive(Debug, Clone)]
pub struct BreathOutput {
    /// Index the analyzer assigned to this sample
    pub index: u64,
    /// Volume after unit conversion, in mL
    pub volume: f64,
    /// Airway pressure, in cmH2O
    pub pressure: f64,
    /// Volume relative to the expiratory baseline, once one exists.
    /// This is the y-coordinate of the pressure-volume loop.
    pub relative_volume: Option<f64>,
    /// Phase after this sample was classified
    pub phase: Phase,
    /// Transition edge that fired, if any (noise-reverted edges excluded)
    pub edge: Option<PhaseEdge>,
    /// Per-breath statistics, emitted on transitions
    pub stats: Option<StatsRecord>,
    /// Plot marker at a phase extremum, emitted on transitions
    pub marker: Option<Marker>,
    /// Alarms raised by this sample
    pub alarms: Vec<AlarmEvent>,
}

/// Online breath-cycle analyzer.
///
/// # Example
/// ```
/// use breathwatch::breath::{analyzer::BreathAnalyzer, Sample};
/// use breathwatch::config::AnalyzerConfig;
///
/// let config = AnalyzerConfig {
///     volume_scaler: 1.0,
///     ..Default::default()
/// };
/// let mut analyzer = BreathAnalyzer::new(&config);
///
/// let out = analyzer.process(&Sample {
///     timestamp: 0.0,
///     volume: 120.0,
///     pressure: 5.0,
/// });
/// assert_eq!(out.volume, 120.0);
/// ```
#[derive(Debug)]
pub struct BreathAnalyzer {
    volume_scaler: f64,
    extrema: ExtremaTracker,
    detector: PhaseDetector,
    metrics: MetricsEstimator,
    alarms: AlarmEvaluator,
    sample_index: u64,
}

impl BreathAnalyzer {
    /// Create an analyzer from startup configuration.
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            volume_scaler: config.volume_scaler,
            extrema: ExtremaTracker::new(),
            detector: PhaseDetector::new(config.backup_rate),
            metrics: MetricsEstimator::new(
                config.rate_smoothing,
                config.vol_tidal_smoothing,
                config.minimum_volume_breath,
            ),
            alarms: AlarmEvaluator::new(config.vol_leakage_warning),
            sample_index: 0,
        }
    }

    /// Run the pipeline for one sample.
    ///
    /// Each call's effects are atomic relative to the loop: the index only
    /// advances for samples that reach this method, so discarded source
    /// records never move the phase state.
    pub fn process(&mut self, sample: &Sample) -> BreathOutput {
        let index = self.sample_index;
        let volume = units::to_milliliters(sample.volume, self.volume_scaler);

        self.extrema
            .observe(volume, sample.pressure, index, sample.timestamp);

        let mut edge = self
            .detector
            .update(sample.timestamp, volume, &mut self.extrema);

        let mut stats = None;
        let mut marker = None;

        match edge {
            Some(PhaseEdge::InspiratoryStart { .. }) => {
                let (s, m) = self.metrics.on_inspiratory_start(&mut self.extrema, index);
                if let Some(trough_ts) = self.metrics.record().expiratory_timestamp {
                    self.detector.note_expiratory_trough(trough_ts);
                }
                stats = s;
                marker = m;
            }
            Some(PhaseEdge::ExpiratoryStart { forced }) => {
                let outcome =
                    self.metrics
                        .on_expiratory_start(&mut self.extrema, volume, index, forced);
                if outcome.reverted {
                    self.detector.revert_to_inspiratory();
                    edge = None;
                } else {
                    if let Some(peak_ts) = self.metrics.record().inspiratory_timestamp {
                        self.detector.note_inspiratory_peak(peak_ts);
                    }
                    stats = outcome.stats;
                    marker = outcome.marker;
                }
            }
            None => {}
        }

        let mut alarms = Vec::new();
        if let Some(alarm) = self.alarms.check(volume, self.metrics.expiratory_volume()) {
            tracing::warn!(
                magnitude_ml = %format!("{:.2}", alarm.magnitude),
                "leakage warning"
            );
            alarms.push(alarm);
        }

        if let Some(record) = &stats {
            tracing::debug!(
                index = record.index,
                rate = %format!("{:.2}", record.respiratory_rate),
                tidal_ml = %format!("{:.2}", record.tidal_volume),
                ppeak = %format!("{:.2}", record.peak_pressure),
                peep = %format!("{:.2}", record.peep),
                "breath stats"
            );
        }

        self.sample_index += 1;

        BreathOutput {
            index,
            volume,
            pressure: sample.pressure,
            relative_volume: self.metrics.expiratory_volume().map(|b| volume - b),
            phase: self.detector.phase(),
            edge,
            stats,
            marker,
            alarms,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.detector.phase()
    }

    /// The live record of breath-derived quantities.
    pub fn record(&self) -> &BreathRecord {
        self.metrics.record()
    }

    /// Number of samples processed so far.
    pub fn samples_processed(&self) -> u64 {
        self.sample_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breath::metrics::MarkerKind;
    use approx::assert_relative_eq;

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig {
            volume_scaler: 1.0,
            ..Default::default()
        }
    }

    fn sample(timestamp: f64, volume: f64, pressure: f64) -> Sample {
        Sample {
            timestamp,
            volume,
            pressure,
        }
    }

    /// One triangular breath per 4 seconds: 0, 50, 100, 50, 0, ...
    fn feed_triangle(analyzer: &mut BreathAnalyzer, seconds: u64) -> Vec<BreathOutput> {
        let wave = [0.0, 50.0, 100.0, 50.0];
        let pressure = [5.0, 10.0, 15.0, 8.0];
        (0..seconds)
            .map(|i| {
                let k = (i % 4) as usize;
                analyzer.process(&sample(i as f64, wave[k], pressure[k]))
            })
            .collect()
    }

    #[test]
    fn test_conversion_applied() {
        let config = AnalyzerConfig::default(); // scaler 0.0018
        let mut analyzer = BreathAnalyzer::new(&config);
        let out = analyzer.process(&sample(0.0, 1000.0, 5.0));
        assert_relative_eq!(out.volume, 1.8);
    }

    #[test]
    fn test_index_advances_per_sample() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        assert_eq!(analyzer.process(&sample(0.0, 0.0, 5.0)).index, 0);
        assert_eq!(analyzer.process(&sample(1.0, 1.0, 5.0)).index, 1);
        assert_eq!(analyzer.samples_processed(), 2);
    }

    #[test]
    fn test_steady_breathing_converges() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        let outputs = feed_triangle(&mut analyzer, 60);

        let last_stats = outputs
            .iter()
            .rev()
            .find_map(|o| o.stats)
            .expect("steady breathing must emit stats");

        // Period 4s -> 15 breaths/min; amplitude 100 mL
        assert_relative_eq!(last_stats.respiratory_rate, 15.0, epsilon = 0.1);
        assert_relative_eq!(last_stats.tidal_volume, 100.0, epsilon = 1.0);
        assert_relative_eq!(last_stats.peak_pressure, 15.0);
        assert_relative_eq!(last_stats.peep, 5.0);
        assert!(last_stats.leak_estimate.abs() < 1e-9);
    }

    #[test]
    fn test_markers_sit_on_extrema() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        let outputs = feed_triangle(&mut analyzer, 20);

        let peaks: Vec<&Marker> = outputs
            .iter()
            .filter_map(|o| o.marker.as_ref())
            .filter(|m| m.kind == MarkerKind::InspiratoryMax)
            .collect();
        assert!(!peaks.is_empty());
        for m in peaks {
            // Peak samples are at indices 2, 6, 10, ...
            assert_eq!(m.index % 4, 2, "peak marker at the volume maximum");
        }
    }

    #[test]
    fn test_relative_volume_tracks_baseline() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        let outputs = feed_triangle(&mut analyzer, 12);

        assert!(outputs[0].relative_volume.is_none(), "no baseline yet");
        let last = outputs.last().unwrap();
        // Baseline is 0, so relative volume equals volume
        assert_relative_eq!(last.relative_volume.unwrap(), last.volume);
    }

    #[test]
    fn test_noise_revert_suppresses_edge_and_stats() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        feed_triangle(&mut analyzer, 12);
        assert_eq!(analyzer.phase(), Phase::Expiratory);

        // Settle at the baseline, then wiggle 5 mL: under the 10 mL minimum
        analyzer.process(&sample(12.0, 0.0, 5.0));
        let up = analyzer.process(&sample(13.0, 5.0, 5.0));
        assert!(matches!(
            up.edge,
            Some(PhaseEdge::InspiratoryStart { .. })
        ));
        let down = analyzer.process(&sample(14.0, 2.0, 5.0));
        assert!(down.edge.is_none(), "noise edge must be discarded");
        assert!(down.stats.is_none());
        assert_eq!(down.phase, Phase::Inspiratory, "phase reverted");
    }

    #[test]
    fn test_leakage_alarm_mid_phase() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        feed_triangle(&mut analyzer, 13); // ends just after an insp start

        let out = analyzer.process(&sample(13.0, 3000.0, 10.0));
        assert_eq!(out.alarms.len(), 1);
        assert_relative_eq!(out.alarms[0].magnitude, 3000.0);
    }

    #[test]
    fn test_baseline_drift_below_threshold_no_alarm() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        // First breath from baseline 0, second from baseline 50
        let wave = [0.0, 200.0, 400.0, 200.0, 50.0, 250.0, 450.0, 250.0, 50.0];
        let mut alarm_count = 0;
        for (i, &v) in wave.iter().enumerate() {
            alarm_count += analyzer.process(&sample(i as f64, v, 8.0)).alarms.len();
        }
        assert_eq!(alarm_count, 0, "50 mL drift is far below the 2000 mL threshold");
    }

    #[test]
    fn test_stalled_waveform_forces_cycling() {
        let mut analyzer = BreathAnalyzer::new(&test_config());
        let mut forced_edges = 0;
        for i in 0..60 {
            let out = analyzer.process(&sample(i as f64, 100.0, 10.0));
            if let Some(
                PhaseEdge::InspiratoryStart { forced: true }
                | PhaseEdge::ExpiratoryStart { forced: true },
            ) = out.edge
            {
                forced_edges += 1;
            }
        }
        assert!(
            forced_edges >= 3,
            "60s of flat volume at 8/min backup must force several cycles, got {}",
            forced_edges
        );
    }

    #[test]
    fn test_stalled_waveform_rate_settles_at_backup_rate() {
        let mut analyzer = BreathAnalyzer::new(&test_config());

        let mut inspiratory_starts = Vec::new();
        let mut last_rate = 0.0;
        for i in 0..1200 {
            let ts = i as f64 * 0.1;
            let out = analyzer.process(&sample(ts, 100.0, 10.0));
            if let Some(PhaseEdge::InspiratoryStart { .. }) = out.edge {
                inspiratory_starts.push(ts);
            }
            if let Some(stats) = out.stats {
                last_rate = stats.respiratory_rate;
            }
        }

        assert!(inspiratory_starts.len() >= 10);
        for pair in inspiratory_starts.windows(2) {
            let period = pair[1] - pair[0];
            assert!(
                period > 7.5 && period < 8.5,
                "forced breath period must be one backup interval, got {:.1}s",
                period
            );
        }
        // 8/min backup -> one forced breath per 7.5s budget
        assert!(
            (last_rate - 8.0).abs() < 0.5,
            "smoothed rate must settle near the backup rate, got {:.2}/min",
            last_rate
        );
    }
}
