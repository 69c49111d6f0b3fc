//! E2E tests for the safety behaviors
//!
//! Covers the backup-rate liveness override, the minimum-breath noise
//! guard, and the leakage alarm, running the whole pipeline the way the
//! monitoring loop does.

use approx::assert_relative_eq;
use breathwatch::breath::phase::PhaseEdge;
use breathwatch::{AnalyzerConfig, BreathAnalyzer, Phase, Sample, StatsStore};

fn config() -> AnalyzerConfig {
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

/// A completely flat waveform must never pin the detector in one phase:
/// the 8/min backup rate forces one full breath per 7.5s interval, and
/// the smoothed rate settles at the backup rate.
#[test]
fn test_flat_waveform_liveness() {
    let mut analyzer = BreathAnalyzer::new(&config());
    let mut store = StatsStore::new();

    let mut inspiratory_starts = Vec::new();
    for i in 0..1200 {
        let ts = i as f64 * 0.1;
        let out = analyzer.process(&sample(ts, 100.0, 10.0));
        match out.edge {
            Some(PhaseEdge::InspiratoryStart { forced }) => {
                assert!(forced);
                inspiratory_starts.push(ts);
            }
            Some(PhaseEdge::ExpiratoryStart { forced }) => assert!(forced),
            None => {}
        }
        if let Some(stats) = &out.stats {
            store.record_breath(stats);
        }
    }

    assert!(
        inspiratory_starts.len() >= 10,
        "120s at 8/min backup must force many breaths, got {}",
        inspiratory_starts.len()
    );
    // One forced breath per backup interval, not one per two intervals
    for pair in inspiratory_starts.windows(2) {
        let period = pair[1] - pair[0];
        assert!(
            period > 7.5 && period < 8.5,
            "forced breath period must be one backup interval, got {:.1}s",
            period
        );
    }
    assert_relative_eq!(store.stats().current_rate, 8.0, epsilon = 0.5);
}

/// Forced cycles still complete breaths: stats are emitted and stay
/// finite even though the volume never moves.
#[test]
fn test_forced_cycles_emit_finite_stats() {
    let mut analyzer = BreathAnalyzer::new(&config());
    let mut store = StatsStore::new();

    for i in 0..120 {
        let out = analyzer.process(&sample(i as f64, 100.0, 10.0));
        if let Some(stats) = &out.stats {
            store.record_breath(stats);
        }
        // Volume equals the baseline, so no leakage alarm
        assert!(out.alarms.is_empty());
    }

    assert!(store.stats().breath_count >= 3);
    assert!(store.stats().current_rate.is_finite());
    assert_relative_eq!(store.stats().current_tidal, 0.0);
}

/// Sub-threshold wiggles after a real breath are noise: no stats, no
/// edges, and the phase reverts to Inspiratory.
#[test]
fn test_minimum_breath_guard_suppresses_noise() {
    let mut analyzer = BreathAnalyzer::new(&config());

    // One real breath to establish a baseline of 0
    analyzer.process(&sample(0.0, 0.0, 5.0));
    analyzer.process(&sample(1.0, 200.0, 15.0));
    analyzer.process(&sample(2.0, 400.0, 20.0));
    analyzer.process(&sample(3.0, 200.0, 10.0));
    analyzer.process(&sample(4.0, 0.0, 5.0));
    analyzer.process(&sample(5.0, 200.0, 15.0)); // second inspiration begins

    // Descent to within 10 mL of the baseline fires an expiratory edge
    // that the guard swallows and reverts
    let down = analyzer.process(&sample(6.0, 2.0, 6.0));
    assert!(down.edge.is_none(), "noise edge must be swallowed");
    assert!(down.stats.is_none());
    assert_eq!(down.phase, Phase::Inspiratory);

    // Wiggles near the baseline keep being swallowed
    analyzer.process(&sample(7.0, 8.0, 6.0));
    let down2 = analyzer.process(&sample(8.0, 3.0, 6.0));
    assert!(down2.edge.is_none());
    assert!(down2.stats.is_none());
    assert_eq!(down2.phase, Phase::Inspiratory);
}

/// Volume rising more than 2000 mL above the expiratory baseline raises
/// the leakage warning on every offending sample.
#[test]
fn test_leakage_alarm_fires_above_threshold() {
    let mut analyzer = BreathAnalyzer::new(&config());

    // Establish a baseline of 0
    analyzer.process(&sample(0.0, 0.0, 5.0));
    analyzer.process(&sample(1.0, 200.0, 15.0));

    // Runaway volume: both samples past the threshold must alarm
    let first = analyzer.process(&sample(2.0, 2500.0, 25.0));
    assert_eq!(first.alarms.len(), 1);
    assert_relative_eq!(first.alarms[0].magnitude, 2500.0);

    let second = analyzer.process(&sample(3.0, 2600.0, 25.0));
    assert_eq!(second.alarms.len(), 1);
}

/// No baseline yet means the leakage check cannot run.
#[test]
fn test_no_alarm_before_first_breath() {
    let mut analyzer = BreathAnalyzer::new(&config());

    let out = analyzer.process(&sample(0.0, 5000.0, 10.0));
    assert!(out.alarms.is_empty());
}

/// Volume below the threshold never alarms, regardless of drift.
#[test]
fn test_breathing_below_threshold_never_alarms() {
    let mut analyzer = BreathAnalyzer::new(&config());

    let wave = [0.0, 600.0, 1200.0, 600.0];
    for i in 0..60u64 {
        let out = analyzer.process(&sample(i as f64, wave[(i % 4) as usize], 10.0));
        assert!(out.alarms.is_empty(), "1200 mL breaths are in range");
    }
}

/// After forced cycling on a dead waveform, a recovering signal takes
/// over again with natural transitions.
#[test]
fn test_recovery_after_forced_cycling() {
    let mut analyzer = BreathAnalyzer::new(&config());

    for i in 0..30 {
        analyzer.process(&sample(i as f64, 100.0, 10.0));
    }

    // Signal returns: 4s triangular breaths
    let wave = [100.0, 300.0, 500.0, 300.0];
    let mut natural_edges = 0;
    for i in 0..40u64 {
        let ts = 30.0 + i as f64;
        let out = analyzer.process(&sample(ts, wave[(i % 4) as usize], 10.0));
        if let Some(
            PhaseEdge::InspiratoryStart { forced: false }
            | PhaseEdge::ExpiratoryStart { forced: false },
        ) = out.edge
        {
            natural_edges += 1;
        }
    }

    assert!(
        natural_edges >= 10,
        "recovered waveform must drive natural transitions, got {}",
        natural_edges
    );
}
