//! Leakage alarm evaluation
//!
//! Checked once per incoming sample, not only on transitions, since a leak
//! can develop mid-phase.

/// Alarm categories raised by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    /// Current volume exceeds the expiratory baseline by more than the
    /// configured leakage threshold
    LeakageWarning,
}

/// An alarm event. Ephemeral: produced for the sink/log, not retained by
/// the analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmEvent {
    pub kind: AlarmKind,
    /// Volume excess above the expiratory baseline, in mL
    pub magnitude: f64,
}

/// Threshold comparator for circuit-leakage warnings.
#[derive(Debug)]
pub struct AlarmEvaluator {
    /// Volume excess above the baseline that triggers a warning, in mL
    vol_leakage_warning: f64,
}

impl AlarmEvaluator {
    pub fn new(vol_leakage_warning: f64) -> Self {
        Self {
            vol_leakage_warning,
        }
    }

    /// Evaluate one sample against the expiratory baseline.
    ///
    /// Returns a [`AlarmKind::LeakageWarning`] when a baseline exists and
    /// the current volume exceeds it by more than the threshold.
    pub fn check(&self, current_volume: f64, expiratory_volume: Option<f64>) -> Option<AlarmEvent> {
        let baseline = expiratory_volume?;
        let excess = current_volume - baseline;
        if excess > self.vol_leakage_warning {
            Some(AlarmEvent {
                kind: AlarmKind::LeakageWarning,
                magnitude: excess,
            })
        } else {
            None
        }
    }
}
