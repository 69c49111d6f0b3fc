//! Running per-phase extrema of volume and pressure
//!
//! Tracks the maximum and minimum volume (with sample index and timestamp)
//! and the maximum and minimum pressure seen since the matching reset.
//! Fields are `Option`-typed: `None` means "unset", so a freshly reset
//! extremum can never be read as a real value.
//!
//! Resets are staggered across phase transitions: entering a phase resets
//! only the extremum that starts accumulating for that phase, while the
//! previous phase's extremum stays readable until the metrics for the
//! just-completed breath have been computed.

/// A volume extremum with the sample index and timestamp where it occurred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumePoint {
    /// Volume in mL
    pub value: f64,
    /// Index of the sample that set this extremum
    pub index: u64,
    /// Timestamp of the sample that set this extremum
    pub timestamp: f64,
}

/// Running extrema for the current phase.
#[derive(Debug, Clone, Default)]
pub struct ExtremaTracker {
    max_volume: Option<VolumePoint>,
    min_volume: Option<VolumePoint>,
    max_pressure: Option<f64>,
    min_pressure: Option<f64>,
}

impl ExtremaTracker {
    /// Create a tracker with all extrema unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one sample, updating every tracked extremum by comparison.
    ///
    /// Unset extrema are initialized by the first observation.
    pub fn observe(&mut self, volume: f64, pressure: f64, index: u64, timestamp: f64) {
        let point = VolumePoint {
            value: volume,
            index,
            timestamp,
        };

        match self.max_volume {
            Some(ref p) if volume <= p.value => {}
            _ => self.max_volume = Some(point),
        }
        match self.min_volume {
            Some(ref p) if volume >= p.value => {}
            _ => self.min_volume = Some(point),
        }

        match self.max_pressure {
            Some(p) if pressure <= p => {}
            _ => self.max_pressure = Some(pressure),
        }
        match self.min_pressure {
            Some(p) if pressure >= p => {}
            _ => self.min_pressure = Some(pressure),
        }
    }

    /// Maximum volume seen since the last [`Self::reset_max_volume`].
    pub fn max_volume(&self) -> Option<VolumePoint> {
        self.max_volume
    }

    /// Minimum volume seen since the last [`Self::reset_min_volume`].
    pub fn min_volume(&self) -> Option<VolumePoint> {
        self.min_volume
    }

    /// Maximum pressure seen since the last [`Self::reset_max_pressure`].
    pub fn max_pressure(&self) -> Option<f64> {
        self.max_pressure
    }

    /// Minimum pressure seen since the last [`Self::reset_min_pressure`].
    pub fn min_pressure(&self) -> Option<f64> {
        self.min_pressure
    }

    /// Unset the volume maximum. Called at inspiratory start so the new
    /// inspiration accumulates its own peak.
    pub fn reset_max_volume(&mut self) {
        self.max_volume = None;
    }

    /// Unset the volume minimum. Called at expiratory start so the new
    /// expiration accumulates its own trough.
    pub fn reset_min_volume(&mut self) {
        self.min_volume = None;
    }

    /// Unset the pressure maximum. Called after peak pressure is read at
    /// expiratory start.
    pub fn reset_max_pressure(&mut self) {
        self.max_pressure = None;
    }

    /// Unset the pressure minimum. Called after PEEP is read at
    /// inspiratory start.
    pub fn reset_min_pressure(&mut self) {
        self.min_pressure = None;
    }

    /// Overwrite the minimum-volume timestamp if a minimum is set.
    ///
    /// Used by the backup-rate override: a forced inspiratory transition is
    /// a synthetic expiratory end, so the tidal-volume bookkeeping records
    /// the forcing time as the expiratory trough time.
    pub fn stamp_min_volume(&mut self, timestamp: f64) {
        if let Some(ref mut p) = self.min_volume {
            p.timestamp = timestamp;
        }
    }

    /// Overwrite the maximum-volume timestamp if a maximum is set.
    ///
    /// Counterpart of [`Self::stamp_min_volume`] for forced expiratory
    /// transitions.
    pub fn stamp_max_volume(&mut self, timestamp: f64) {
        if let Some(ref mut p) = self.max_volume {
            p.timestamp = timestamp;
        }
    }
}
