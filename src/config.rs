//! Analyzer configuration
//!
//! Startup constants for the analysis pipeline, loadable from a JSON file.
//! Every field has a default matching the sensor rig's calibration, so a
//! missing or partial file degrades gracefully. No runtime
//! reconfiguration: the analyzer copies what it needs at construction.

use serde::{Deserialize, Serialize};

use crate::breath::units::VOLUME_SCALER;

fn default_volume_scaler() -> f64 {
    VOLUME_SCALER
}

fn default_minimum_volume_breath() -> f64 {
    10.0
}

fn default_vol_leakage_warning() -> f64 {
    2000.0
}

fn default_rate_smoothing() -> f64 {
    0.5
}

fn default_vol_tidal_smoothing() -> f64 {
    0.5
}

fn default_backup_rate() -> f64 {
    8.0
}

/// Startup configuration for [`crate::breath::analyzer::BreathAnalyzer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Multiplier from raw volume counts to mL
    #[serde(default = "default_volume_scaler")]
    pub volume_scaler: f64,
    /// Volume excursion below which an expiratory edge is noise, in mL
    #[serde(default = "default_minimum_volume_breath")]
    pub minimum_volume_breath: f64,
    /// Volume excess above the expiratory baseline that raises a leakage
    /// warning, in mL
    #[serde(default = "default_vol_leakage_warning")]
    pub vol_leakage_warning: f64,
    /// EMA retention factor for the respiratory rate (0..1)
    #[serde(default = "default_rate_smoothing")]
    pub rate_smoothing: f64,
    /// EMA retention factor for the tidal volume (0..1)
    #[serde(default = "default_vol_tidal_smoothing")]
    pub vol_tidal_smoothing: f64,
    /// Minimum forced breathing rate in breaths/min
    #[serde(default = "default_backup_rate")]
    pub backup_rate: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            volume_scaler: default_volume_scaler(),
            minimum_volume_breath: default_minimum_volume_breath(),
            vol_leakage_warning: default_vol_leakage_warning(),
            rate_smoothing: default_rate_smoothing(),
            vol_tidal_smoothing: default_vol_tidal_smoothing(),
            backup_rate: default_backup_rate(),
        }
    }
}

impl AnalyzerConfig {
    /// Load config from a JSON file, falling back to defaults on any error.
    pub fn load(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed.
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }
}
