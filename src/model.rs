use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::data::Compound;
use crate::stint::Stint;

/// Wear rate of one stint, in seconds per lap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradationSlope {
    pub driver: String,
    pub compound: Compound,
    pub stint: usize,
    /// Never negative: a stint that got faster reports zero wear.
    pub slope: f64,
    pub label: String,
}

/// Least-squares slope of `ys` against their index `0..n`.
///
/// Lap times are taken relative to the first sample before summing; the slope
/// is unchanged by the shift and the sums stay small. Returns `None` when fewer
/// than two samples are given.
pub fn ols_slope(ys: &[f64]) -> Option<f64> {
    if ys.len() < 2 {
        return None;
    }
    let n = ys.len() as f64;
    let origin = ys[0];

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let x = i as f64;
        let y = y - origin;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }
    Some((n * sum_xy - sum_x * sum_y) / denom)
}

/// Slope for one stint, or `None` when the stint is too short to fit.
pub fn estimate_slope(stint: &Stint, driver: &str, cfg: &AnalysisConfig) -> Option<DegradationSlope> {
    if stint.len() < cfg.min_slope_laps {
        return None;
    }
    let slope = ols_slope(&stint.lap_times())?.max(0.0);
    Some(DegradationSlope {
        driver: driver.to_string(),
        compound: stint.compound().clone(),
        stint: stint.number(),
        slope,
        label: format!("{driver} {} (stint {}): {slope:.3}s/lap", stint.compound(), stint.number()),
    })
}

pub fn estimate_slopes(stints: &[Stint], driver: &str, cfg: &AnalysisConfig) -> Vec<DegradationSlope> {
    stints
        .iter()
        .filter_map(|s| estimate_slope(s, driver, cfg))
        .collect()
}
