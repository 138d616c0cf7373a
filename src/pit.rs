use serde::Serialize;
use std::fmt;

use crate::config::AnalysisConfig;
use crate::data::Compound;
use crate::stint::Stint;

/// Age class of the tyre a stint starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum TyreStatus {
    New,
    Used(u32),
}

impl TyreStatus {
    pub fn classify(tyre_life: u32, cfg: &AnalysisConfig) -> Self {
        if tyre_life < cfg.new_tyre_max_age {
            TyreStatus::New
        } else {
            TyreStatus::Used(tyre_life)
        }
    }
}

impl fmt::Display for TyreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TyreStatus::New => f.write_str("NEW"),
            TyreStatus::Used(age) => write!(f, "USED ({age}L)"),
        }
    }
}

impl From<TyreStatus> for String {
    fn from(status: TyreStatus) -> Self {
        status.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PitStopEvent {
    /// First lap on the new tyres.
    pub lap: u32,
    pub from_compound: Compound,
    pub to_compound: Compound,
    pub tyre_status: TyreStatus,
}

/// One event per stint boundary, in race order.
pub fn extract_pit_stops(stints: &[Stint], cfg: &AnalysisConfig) -> Vec<PitStopEvent> {
    stints
        .windows(2)
        .map(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            let first = next.first_lap();
            PitStopEvent {
                lap: first.lap,
                from_compound: prev.compound().clone(),
                to_compound: next.compound().clone(),
                tyre_status: TyreStatus::classify(first.tyre_life, cfg),
            }
        })
        .collect()
}
