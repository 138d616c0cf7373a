use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::LoadError;

/// Tunable constants of the analysis. The defaults reproduce the dashboard's
/// calibration; nothing downstream hard-codes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// A lap is traffic when slower than `traffic_threshold` × neighbour average.
    pub traffic_threshold: f64,
    /// Laps slower than this (seconds) are left out of traffic analysis.
    pub traffic_ceiling_s: f64,
    /// Series shorter than this are returned without traffic flags.
    pub traffic_min_laps: usize,
    /// Tyres younger than this many laps count as NEW.
    pub new_tyre_max_age: u32,
    /// Stints need at least this many laps for a slope fit.
    pub min_slope_laps: usize,
    pub max_selected_drivers: usize,
    pub min_fleet_laps: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            traffic_threshold: 1.07,
            traffic_ceiling_s: 150.0,
            traffic_min_laps: 5,
            new_tyre_max_age: 4,
            min_slope_laps: 4,
            max_selected_drivers: 10,
            min_fleet_laps: 5,
        }
    }
}

impl AnalysisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}
