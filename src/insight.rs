use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::data::{Compound, DriverSeries, SessionKind};
use crate::pit::{PitStopEvent, TyreStatus};

/// Number of drivers that reach the final qualifying segment.
const FINAL_SEGMENT_CARS: u32 = 10;
/// Cut-off position for reaching the second segment.
const SECOND_SEGMENT_CARS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FastestLap {
    pub lap: u32,
    pub lap_time: f64,
}

/// Where a driver's qualifying ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Knockout {
    /// Session part of the driver's last recorded lap.
    pub last_part: Option<String>,
    pub is_out: bool,
    /// Segment the driver was eliminated in, when knocked out.
    pub eliminated_in: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverInsight {
    pub driver: String,
    pub starting_compound: Compound,
    pub starting_tyre_status: TyreStatus,
    pub fastest_lap: FastestLap,
    pub stop_count: usize,
    pub pit_stops: Vec<PitStopEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knockout: Option<Knockout>,
}

/// A lap where the qualifying segment changes from the previous lap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentMarker {
    pub lap: u32,
    pub part: String,
}

/// Earliest lap holding the minimum lap time.
pub fn fastest_lap(series: &DriverSeries) -> Option<FastestLap> {
    series.laps().iter().fold(None, |best: Option<FastestLap>, rec| match best {
        Some(b) if b.lap_time <= rec.lap_time => Some(b),
        _ => Some(FastestLap {
            lap: rec.lap,
            lap_time: rec.lap_time,
        }),
    })
}

/// Classifies the end of a qualifying session. A known finishing position wins
/// over the last recorded session part. Race-type sessions yield `None`.
pub fn classify_knockout(
    last_part: Option<&str>,
    position: Option<u32>,
    session: SessionKind,
) -> Option<Knockout> {
    if !session.is_qualifying() {
        return None;
    }
    let prefix = match session {
        SessionKind::SprintQualifying => "SQ",
        _ => "Q",
    };

    let eliminated_in = match position {
        Some(p) if p <= FINAL_SEGMENT_CARS => None,
        Some(p) if p <= SECOND_SEGMENT_CARS => Some(format!("{prefix}2")),
        Some(_) => Some(format!("{prefix}1")),
        None => last_part
            .map(|p| p.trim().to_uppercase())
            .filter(|p| p.ends_with('1') || p.ends_with('2')),
    };

    Some(Knockout {
        last_part: last_part.map(str::to_string),
        is_out: eliminated_in.is_some(),
        eliminated_in,
    })
}

pub fn segment_markers(series: &DriverSeries) -> Vec<SegmentMarker> {
    series
        .laps()
        .windows(2)
        .filter_map(|pair| match (&pair[0].session_part, &pair[1].session_part) {
            (prev, Some(part)) if prev.as_ref() != Some(part) => Some(SegmentMarker {
                lap: pair[1].lap,
                part: part.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Summary card for one driver, `None` when the driver has no laps.
pub fn build_insight(
    series: &DriverSeries,
    pit_stops: &[PitStopEvent],
    session: SessionKind,
    position: Option<u32>,
    cfg: &AnalysisConfig,
) -> Option<DriverInsight> {
    let first = series.laps().first()?;
    let last = series.laps().last()?;

    Some(DriverInsight {
        driver: series.driver().to_string(),
        starting_compound: first.compound.clone(),
        starting_tyre_status: TyreStatus::classify(first.tyre_life, cfg),
        fastest_lap: fastest_lap(series)?,
        stop_count: pit_stops.len(),
        pit_stops: pit_stops.to_vec(),
        knockout: classify_knockout(last.session_part.as_deref(), position, session),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LapRecord;
    use crate::pit::extract_pit_stops;
    use crate::stint::segment_stints;

    fn quali_series(parts: &[(&str, f64)]) -> DriverSeries {
        let laps = parts
            .iter()
            .enumerate()
            .map(|(i, (part, t))| {
                LapRecord::new(i as u32 + 1, *t, Compound::Soft, 1).with_session_part(*part)
            })
            .collect();
        DriverSeries::new("TSU", laps).unwrap()
    }

    #[test]
    fn fastest_lap_keeps_earliest_tie() {
        let laps = vec![
            LapRecord::new(1, 91.0, "SOFT", 1),
            LapRecord::new(2, 89.5, "SOFT", 2),
            LapRecord::new(3, 90.0, "SOFT", 3),
            LapRecord::new(4, 89.5, "SOFT", 4),
        ];
        let series = DriverSeries::new("SAI", laps).unwrap();
        assert_eq!(
            fastest_lap(&series),
            Some(FastestLap { lap: 2, lap_time: 89.5 })
        );
    }

    #[test]
    fn knockout_from_last_part() {
        let ko = classify_knockout(Some("Q2"), None, SessionKind::Qualifying).unwrap();
        assert!(ko.is_out);
        assert_eq!(ko.eliminated_in.as_deref(), Some("Q2"));

        let through = classify_knockout(Some("Q3"), None, SessionKind::Qualifying).unwrap();
        assert!(!through.is_out);
        assert_eq!(through.last_part.as_deref(), Some("Q3"));
    }

    #[test]
    fn knockout_position_overrides_part() {
        let ko = classify_knockout(Some("Q2"), Some(8), SessionKind::Qualifying).unwrap();
        assert!(!ko.is_out);

        let ko = classify_knockout(Some("Q1"), Some(13), SessionKind::Qualifying).unwrap();
        assert_eq!(ko.eliminated_in.as_deref(), Some("Q2"));

        let ko = classify_knockout(None, Some(18), SessionKind::SprintQualifying).unwrap();
        assert_eq!(ko.eliminated_in.as_deref(), Some("SQ1"));
    }

    #[test]
    fn races_have_no_knockout() {
        assert_eq!(classify_knockout(Some("Q1"), Some(20), SessionKind::Race), None);
        assert_eq!(classify_knockout(None, None, SessionKind::Sprint), None);
    }

    #[test]
    fn markers_at_part_changes() {
        let series = quali_series(&[("Q1", 80.1), ("Q1", 79.8), ("Q2", 79.5), ("Q3", 79.2)]);
        let markers = segment_markers(&series);
        assert_eq!(
            markers,
            vec![
                SegmentMarker { lap: 3, part: "Q2".to_string() },
                SegmentMarker { lap: 4, part: "Q3".to_string() },
            ]
        );
    }

    #[test]
    fn qualifying_insight() {
        let cfg = AnalysisConfig::default();
        let series = quali_series(&[("Q1", 80.1), ("Q1", 79.8), ("Q2", 79.5)]);
        let stints = segment_stints(&series);
        let stops = extract_pit_stops(&stints, &cfg);
        let insight = build_insight(&series, &stops, SessionKind::Qualifying, None, &cfg).unwrap();

        assert_eq!(insight.fastest_lap.lap, 3);
        assert_eq!(insight.stop_count, 0);
        let ko = insight.knockout.unwrap();
        assert_eq!(ko.last_part.as_deref(), Some("Q2"));
        assert!(ko.is_out);
    }

    #[test]
    fn empty_series_has_no_insight() {
        let cfg = AnalysisConfig::default();
        let series = DriverSeries::empty("TSU");
        assert!(build_insight(&series, &[], SessionKind::Race, None, &cfg).is_none());
    }

    #[test]
    fn starting_tyre_comes_from_first_lap() {
        let cfg = AnalysisConfig::default();
        let laps = vec![
            LapRecord::new(1, 92.0, "HARD", 6),
            LapRecord::new(2, 91.8, "HARD", 7),
            LapRecord::new(3, 93.5, "SOFT", 0),
        ];
        let series = DriverSeries::new("STR", laps).unwrap();
        let stops = extract_pit_stops(&segment_stints(&series), &cfg);
        let insight = build_insight(&series, &stops, SessionKind::Race, None, &cfg).unwrap();

        assert_eq!(insight.starting_compound, Compound::Hard);
        assert_eq!(insight.starting_tyre_status, TyreStatus::Used(6));
        assert_eq!(insight.stop_count, 1);
        assert_eq!(insight.fastest_lap.lap, 2);
    }
}
