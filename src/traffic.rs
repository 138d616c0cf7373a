use tracing::debug;

use crate::config::AnalysisConfig;
use crate::data::DriverSeries;

/// Whether the lap at `idx` is a traffic lap, judged against its immediate
/// neighbours only. The first lap and laps above the ceiling are never flagged.
pub fn is_traffic_lap(times: &[f64], idx: usize, cfg: &AnalysisConfig) -> bool {
    if idx == 0 || idx >= times.len() {
        return false;
    }
    let lap_time = times[idx];
    if lap_time > cfg.traffic_ceiling_s {
        return false;
    }

    let (sum, count) = match times.get(idx + 1) {
        Some(next) => (times[idx - 1] + next, 2.0),
        None => (times[idx - 1], 1.0),
    };
    lap_time > cfg.traffic_threshold * (sum / count)
}

/// Returns a copy of `series` with `is_traffic` set on every lap. Series shorter
/// than `traffic_min_laps` come back unchanged.
pub fn flag_traffic(series: &DriverSeries, cfg: &AnalysisConfig) -> DriverSeries {
    if series.len() < cfg.traffic_min_laps {
        return series.clone();
    }

    let times: Vec<f64> = series.laps().iter().map(|l| l.lap_time).collect();
    let flagged = series.map_laps(|i, rec| {
        let mut rec = rec.clone();
        rec.is_traffic = is_traffic_lap(&times, i, cfg);
        rec
    });

    let count = flagged.laps().iter().filter(|l| l.is_traffic).count();
    debug!(driver = flagged.driver(), traffic_laps = count, "traffic flags applied");
    flagged
}
