use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{AnalysisError, LoadError};

/// Tyre compound tag. Tags outside the known set are kept, upper-cased, as
/// `Unknown` so that one odd row never aborts an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    Unknown(String),
}

impl Compound {
    pub fn as_str(&self) -> &str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
            Compound::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Compound::Unknown(_))
    }
}

impl From<&str> for Compound {
    fn from(tag: &str) -> Self {
        let tag = tag.trim();
        match tag.to_uppercase().as_str() {
            "SOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" => Compound::Hard,
            "INTERMEDIATE" => Compound::Intermediate,
            "WET" => Compound::Wet,
            other => Compound::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Compound {
    fn from(tag: String) -> Self {
        Compound::from(tag.as_str())
    }
}

impl From<Compound> for String {
    fn from(compound: Compound) -> Self {
        compound.as_str().to_string()
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed lap of one driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapRecord {
    pub lap: u32,
    /// Seconds.
    pub lap_time: f64,
    pub compound: Compound,
    /// Laps already completed on this tyre set.
    pub tyre_life: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_part: Option<String>,
    /// km/h
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Set only by the traffic detector.
    #[serde(default)]
    pub is_traffic: bool,
}

impl LapRecord {
    pub fn new(lap: u32, lap_time: f64, compound: impl Into<Compound>, tyre_life: u32) -> Self {
        Self {
            lap,
            lap_time,
            compound: compound.into(),
            tyre_life,
            session_part: None,
            speed: None,
            is_traffic: false,
        }
    }

    pub fn with_session_part(mut self, part: impl Into<String>) -> Self {
        self.session_part = Some(part.into());
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Ordered laps of exactly one driver in one session. Construction checks the
/// ordering invariants; an empty series is valid and means "no data".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverSeries {
    driver: String,
    laps: Vec<LapRecord>,
}

impl DriverSeries {
    pub fn new(driver: impl Into<String>, laps: Vec<LapRecord>) -> Result<Self, AnalysisError> {
        let driver = driver.into();
        if driver.trim().is_empty() {
            return Err(AnalysisError::EmptyDriverId);
        }

        let mut previous: Option<u32> = None;
        for rec in &laps {
            if rec.lap == 0 {
                return Err(AnalysisError::NonPositiveLap { driver, lap: rec.lap });
            }
            if let Some(prev) = previous {
                if rec.lap <= prev {
                    return Err(AnalysisError::NonIncreasingLap {
                        driver,
                        previous: prev,
                        lap: rec.lap,
                    });
                }
            }
            if !(rec.lap_time.is_finite() && rec.lap_time > 0.0) {
                return Err(AnalysisError::NonPositiveLapTime {
                    driver,
                    lap: rec.lap,
                    lap_time: rec.lap_time,
                });
            }
            if let Some(speed) = rec.speed {
                if speed.is_nan() || speed < 0.0 {
                    return Err(AnalysisError::NegativeSpeed {
                        driver,
                        lap: rec.lap,
                        speed,
                    });
                }
            }
            previous = Some(rec.lap);
        }

        Ok(Self { driver, laps })
    }

    pub fn empty(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            laps: Vec::new(),
        }
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Rebuilds the series with per-lap values replaced. Lap numbers and times
    /// must be left untouched by `f`.
    pub(crate) fn map_laps<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, &LapRecord) -> LapRecord,
    {
        let laps = self
            .laps
            .iter()
            .enumerate()
            .map(|(i, rec)| f(i, rec))
            .collect();
        Self {
            driver: self.driver.clone(),
            laps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    #[serde(rename = "R")]
    Race,
    #[serde(rename = "S")]
    Sprint,
    #[serde(rename = "Q")]
    Qualifying,
    #[serde(rename = "SQ")]
    SprintQualifying,
}

impl SessionKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "R" | "RACE" => Some(SessionKind::Race),
            "S" | "SPRINT" => Some(SessionKind::Sprint),
            "Q" | "QUALIFYING" => Some(SessionKind::Qualifying),
            "SQ" | "SPRINT QUALIFYING" | "SPRINT_QUALIFYING" => Some(SessionKind::SprintQualifying),
            _ => None,
        }
    }

    pub fn is_qualifying(self) -> bool {
        matches!(self, SessionKind::Qualifying | SessionKind::SprintQualifying)
    }
}

/// (year, circuit, session) the analysed laps belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub year: u16,
    pub circuit: String,
    pub session: SessionKind,
}

impl SessionContext {
    pub fn new(year: u16, circuit: impl Into<String>, session: SessionKind) -> Self {
        Self {
            year,
            circuit: circuit.into(),
            session,
        }
    }
}

// column names of the exported lap table
#[derive(Debug, Deserialize)]
struct RawLapRow {
    #[serde(rename = "Driver")] driver: String,
    #[serde(rename = "LapNumber")] lap_number: f64,
    #[serde(rename = "LapTime")] lap_time: Option<f64>,
    #[serde(rename = "Compound")] compound: String,
    #[serde(rename = "TyreLife")] tyre_life: Option<f64>,
    #[serde(rename = "SessionPart", default)] session_part: Option<String>,
    #[serde(rename = "Speed", default)] speed: Option<f64>,
    #[serde(rename = "Position", default)] position: Option<f64>,
}

/// Lap table loaded and split per driver. Drivers whose rows break the series
/// invariants land in `rejected` without affecting the others.
#[derive(Debug, Default)]
pub struct LoadedSession {
    pub series: BTreeMap<String, DriverSeries>,
    pub positions: BTreeMap<String, u32>,
    pub rejected: BTreeMap<String, AnalysisError>,
}

pub struct LapLoader;

impl LapLoader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<LoadedSession, LoadError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<LoadedSession, LoadError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut per_driver: BTreeMap<String, Vec<LapRecord>> = BTreeMap::new();
        let mut positions = BTreeMap::new();
        let mut dropped = 0usize;

        for res in reader.deserialize() {
            let raw: RawLapRow = res?;
            let lap_time = raw.lap_time.filter(|t| t.is_finite() && *t > 0.0);
            let tyre_life = raw.tyre_life.filter(|t| t.is_finite() && *t >= 0.0);
            let (Some(lap_time), Some(tyre_life)) = (lap_time, tyre_life) else {
                dropped += 1;
                continue;
            };
            if raw.driver.is_empty()
                || !raw.lap_number.is_finite()
                || raw.lap_number < 1.0
                || raw.compound.is_empty()
            {
                dropped += 1;
                continue;
            }

            let lap = LapRecord {
                lap: raw.lap_number.round() as u32,
                lap_time,
                compound: Compound::from(raw.compound.as_str()),
                tyre_life: tyre_life.round() as u32,
                session_part: raw.session_part.filter(|p| !p.is_empty()),
                speed: raw.speed.filter(|s| s.is_finite() && *s >= 0.0),
                is_traffic: false,
            };
            if let Some(pos) = raw.position.filter(|p| *p >= 1.0) {
                positions.insert(raw.driver.clone(), pos.round() as u32);
            }
            per_driver.entry(raw.driver).or_default().push(lap);
        }

        if dropped > 0 {
            warn!(dropped, "skipped lap rows without a usable time or tyre age");
        }

        let mut loaded = LoadedSession {
            positions,
            ..LoadedSession::default()
        };
        for (driver, mut laps) in per_driver {
            laps.sort_by_key(|l| l.lap);
            match DriverSeries::new(driver.clone(), laps) {
                Ok(series) => {
                    debug!(driver = %driver, laps = series.len(), "loaded driver series");
                    loaded.series.insert(driver, series);
                }
                Err(err) => {
                    warn!(driver = %driver, error = %err, "rejecting driver series");
                    loaded.rejected.insert(driver, err);
                }
            }
        }
        Ok(loaded)
    }
}
