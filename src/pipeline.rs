use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::data::{DriverSeries, SessionKind};
use crate::insight::{build_insight, segment_markers, DriverInsight, SegmentMarker};
use crate::model::{estimate_slopes, DegradationSlope};
use crate::pit::{extract_pit_stops, PitStopEvent};
use crate::stint::{segment_stints, Stint};
use crate::traffic::flag_traffic;

/// Everything derived for one driver. `insight` is `None` for a driver without
/// laps; the collections are then empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverAnalysis {
    pub driver: String,
    /// Input laps with traffic flags applied.
    pub series: DriverSeries,
    pub stints: Vec<Stint>,
    pub pit_stops: Vec<PitStopEvent>,
    pub slopes: Vec<DegradationSlope>,
    pub segment_markers: Vec<SegmentMarker>,
    pub insight: Option<DriverInsight>,
}

/// traffic flags -> stints -> pit stops and slopes -> insight
pub fn analyze_driver(
    series: &DriverSeries,
    session: SessionKind,
    position: Option<u32>,
    cfg: &AnalysisConfig,
) -> DriverAnalysis {
    let driver = series.driver();
    let flagged = flag_traffic(series, cfg);
    let stints = segment_stints(&flagged);
    let pit_stops = extract_pit_stops(&stints, cfg);
    let slopes = estimate_slopes(&stints, driver, cfg);
    let insight = build_insight(&flagged, &pit_stops, session, position, cfg);

    debug!(
        driver,
        laps = flagged.len(),
        stints = stints.len(),
        stops = pit_stops.len(),
        slopes = slopes.len(),
        "driver analysed"
    );

    DriverAnalysis {
        driver: driver.to_string(),
        segment_markers: segment_markers(&flagged),
        series: flagged,
        stints,
        pit_stops,
        slopes,
        insight,
    }
}

/// Runs every driver independently. Drivers share nothing, so the order of
/// evaluation never affects a result.
pub fn analyze_all(
    series: &BTreeMap<String, DriverSeries>,
    positions: &BTreeMap<String, u32>,
    session: SessionKind,
    cfg: &AnalysisConfig,
) -> BTreeMap<String, DriverAnalysis> {
    series
        .iter()
        .map(|(driver, s)| {
            let position = positions.get(driver).copied();
            (driver.clone(), analyze_driver(s, session, position, cfg))
        })
        .collect()
}
