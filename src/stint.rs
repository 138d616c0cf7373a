use serde::Serialize;

use crate::data::{Compound, DriverSeries, LapRecord};

/// Maximal run of consecutive laps on one compound. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stint {
    number: usize,
    compound: Compound,
    laps: Vec<LapRecord>,
}

impl Stint {
    /// Builds a stint from laps that all share one compound; `None` for an
    /// empty or mixed run.
    pub fn new(number: usize, laps: Vec<LapRecord>) -> Option<Self> {
        let compound = laps.first()?.compound.clone();
        if laps.iter().any(|l| l.compound != compound) {
            return None;
        }
        Some(Self {
            number,
            compound,
            laps,
        })
    }

    /// 1-based position of the stint in the driver's session.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn compound(&self) -> &Compound {
        &self.compound
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn first_lap(&self) -> &LapRecord {
        &self.laps[0]
    }

    pub fn last_lap(&self) -> &LapRecord {
        &self.laps[self.laps.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn lap_times(&self) -> Vec<f64> {
        self.laps.iter().map(|l| l.lap_time).collect()
    }
}

/// Splits a series into stints at every compound change.
pub fn segment_stints(series: &DriverSeries) -> Vec<Stint> {
    let mut stints: Vec<Stint> = Vec::new();

    for lap in series.laps() {
        match stints.last_mut() {
            Some(current) if current.compound == lap.compound => current.laps.push(lap.clone()),
            _ => {
                let number = stints.len() + 1;
                stints.push(Stint {
                    number,
                    compound: lap.compound.clone(),
                    laps: vec![lap.clone()],
                });
            }
        }
    }
    stints
}
