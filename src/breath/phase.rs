//! Inspiratory/expiratory phase state machine
//!
//! Classifies each sample by the instantaneous volume slope against the
//! previous sample, with a backup-rate override that forces a transition
//! when the last breath extremum is older than one backup interval. The
//! override is a liveness guarantee, not an accuracy guarantee: it keeps
//! the detector from stalling in one phase on a flat or broken waveform,
//! cycling forced breaths at the backup rate.
//!
//! The slope rule has no hysteresis band, so noisy samples can cause phase
//! chatter; the minimum-breath guard in [`super::metrics`] absorbs it.

use super::extrema::ExtremaTracker;
use super::Phase;

/// A phase-transition edge, fired at most once per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEdge {
    /// Phase became Inspiratory; `forced` when the backup-rate timer fired
    InspiratoryStart { forced: bool },
    /// Phase became Expiratory; `forced` when the backup-rate timer fired
    ExpiratoryStart { forced: bool },
}

/// Slope-based phase detector with a backup-rate safety override.
///
/// The override clocks run from the extrema of the last completed breath,
/// not from transition edges: an inspiration is forced when the last
/// expiratory trough is older than one backup interval, so a forced breath
/// cycle completes within a single interval and the smoothed rate settles
/// at the configured backup rate.
#[derive(Debug)]
pub struct PhaseDetector {
    phase: Phase,
    prev_volume: Option<f64>,
    /// Maximum age of the opposite extremum before a transition is forced
    backup_rate_dt: f64,
    /// Time of the last expiratory trough; gates forced inspirations
    last_expiratory_trough: Option<f64>,
    /// Time of the last inspiratory peak; gates forced expirations
    last_inspiratory_peak: Option<f64>,
}

impl PhaseDetector {
    /// Create a detector starting in the Expiratory phase.
    ///
    /// # Arguments
    /// * `backup_rate` - minimum forced breathing rate in breaths/min
    pub fn new(backup_rate: f64) -> Self {
        Self {
            phase: Phase::Expiratory,
            prev_volume: None,
            backup_rate_dt: 60.0 / backup_rate,
            last_expiratory_trough: None,
            last_inspiratory_peak: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time budget per phase derived from the backup rate, in seconds.
    pub fn backup_rate_dt(&self) -> f64 {
        self.backup_rate_dt
    }

    /// Classify one sample, returning a transition edge if one fired.
    ///
    /// The slope rule runs first; a natural transition provisionally
    /// stamps the extremum it just passed (an inspiratory start means a
    /// trough just happened), and the metrics side refines the stamp to
    /// the exact trough/peak time through [`Self::note_expiratory_trough`]
    /// and [`Self::note_inspiratory_peak`]. The override then only forces
    /// a detector *out* of the phase it is stalled in, which makes a
    /// forced and a natural transition mutually exclusive per sample. At
    /// most one edge fires per sample.
    ///
    /// A forced inspiratory transition is a synthetic expiratory end: it
    /// stamps the trough clock and the tracked minimum-volume timestamp
    /// with `timestamp`, so the next forced inspiration comes one backup
    /// interval later. Forced expiratory transitions do the same for the
    /// peak side.
    pub fn update(
        &mut self,
        timestamp: f64,
        volume: f64,
        extrema: &mut ExtremaTracker,
    ) -> Option<PhaseEdge> {
        // The liveness clocks need a reference point before any breath
        // has completed; the first sample seen provides it.
        if self.last_expiratory_trough.is_none() {
            self.last_expiratory_trough = Some(timestamp);
        }
        if self.last_inspiratory_peak.is_none() {
            self.last_inspiratory_peak = Some(timestamp);
        }

        let prev_phase = self.phase;

        if let Some(prev_volume) = self.prev_volume {
            if volume > prev_volume {
                self.phase = Phase::Inspiratory;
            }
            if volume < prev_volume {
                self.phase = Phase::Expiratory;
            }
        }
        self.prev_volume = Some(volume);

        if self.phase != prev_phase {
            match self.phase {
                Phase::Inspiratory => self.last_expiratory_trough = Some(timestamp),
                Phase::Expiratory => self.last_inspiratory_peak = Some(timestamp),
            }
        }

        let mut forced = false;

        if self.phase == Phase::Expiratory {
            if let Some(trough) = self.last_expiratory_trough {
                let elapsed = timestamp - trough;
                if elapsed > self.backup_rate_dt {
                    tracing::info!(elapsed_s = %format!("{:.2}", elapsed), "forcing inspiratory cycle");
                    self.phase = Phase::Inspiratory;
                    self.last_expiratory_trough = Some(timestamp);
                    extrema.stamp_min_volume(timestamp);
                    forced = true;
                }
            }
        } else if let Some(peak) = self.last_inspiratory_peak {
            let elapsed = timestamp - peak;
            if elapsed > self.backup_rate_dt {
                tracing::info!(elapsed_s = %format!("{:.2}", elapsed), "forcing expiratory cycle");
                self.phase = Phase::Expiratory;
                self.last_inspiratory_peak = Some(timestamp);
                extrema.stamp_max_volume(timestamp);
                forced = true;
            }
        }

        if self.phase == prev_phase {
            return None;
        }

        match self.phase {
            Phase::Inspiratory => Some(PhaseEdge::InspiratoryStart { forced }),
            Phase::Expiratory => Some(PhaseEdge::ExpiratoryStart { forced }),
        }
    }

    /// Record the exact trough time of the breath that just completed.
    ///
    /// Called after the metrics for an inspiratory-start edge have been
    /// computed; replaces the provisional edge-time stamp so the backup
    /// timer runs from the true expiratory minimum.
    pub fn note_expiratory_trough(&mut self, timestamp: f64) {
        self.last_expiratory_trough = Some(timestamp);
    }

    /// Record the exact peak time of the inspiration that just completed.
    ///
    /// Counterpart of [`Self::note_expiratory_trough`] for
    /// expiratory-start edges.
    pub fn note_inspiratory_peak(&mut self, timestamp: f64) {
        self.last_inspiratory_peak = Some(timestamp);
    }

    /// Revert an expiratory-start edge back to Inspiratory.
    ///
    /// Called by the minimum-breath guard when a just-fired expiratory
    /// edge turns out to be noise. The peak clock keeps the provisional
    /// stamp from the swallowed edge, so idle noise does not trip the
    /// backup timer.
    pub fn revert_to_inspiratory(&mut self) {
        self.phase = Phase::Inspiratory;
    }
}
