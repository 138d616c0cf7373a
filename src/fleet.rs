use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::data::Compound;
use crate::pipeline::DriverAnalysis;

pub type FittedLinearRegression = linfa_linear::FittedLinearRegression<f64>;

/// Compound-level wear built from many per-driver analyses. It sits beside the
/// per-driver pipeline and never feeds back into it.
pub struct FleetDegradation {
    models: BTreeMap<Compound, FittedLinearRegression>,
    samples: BTreeMap<Compound, usize>,
    mean_slopes: BTreeMap<Compound, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundSummary {
    pub compound: Compound,
    pub samples: usize,
    pub fitted: bool,
    pub mean_slope: Option<f64>,
}

// one clean lap: tyre age and time lost to the driver's best clean lap
struct Sample {
    compound: Compound,
    tyre_life: f64,
    delta: f64,
}

impl FleetDegradation {
    pub fn from_analyses(analyses: &[&DriverAnalysis], cfg: &AnalysisConfig) -> Self {
        let mut samples = Vec::new();
        let mut slopes: BTreeMap<Compound, Vec<f64>> = BTreeMap::new();

        for analysis in analyses {
            for s in &analysis.slopes {
                slopes.entry(s.compound.clone()).or_default().push(s.slope);
            }

            let clean: Vec<_> = analysis
                .series
                .laps()
                .iter()
                .filter(|l| !l.is_traffic && l.lap_time <= cfg.traffic_ceiling_s)
                .collect();
            let best = clean
                .iter()
                .map(|l| l.lap_time)
                .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            let Some(best) = best else { continue };

            samples.extend(clean.iter().map(|l| Sample {
                compound: l.compound.clone(),
                tyre_life: l.tyre_life as f64,
                delta: l.lap_time - best,
            }));
        }

        let mut counts: BTreeMap<Compound, usize> = BTreeMap::new();
        for s in &samples {
            *counts.entry(s.compound.clone()).or_default() += 1;
        }

        let models = counts
            .keys()
            .filter_map(|c| Self::build_model(&samples, c, cfg).map(|m| (c.clone(), m)))
            .collect();

        let mean_slopes = slopes
            .into_iter()
            .map(|(c, v)| {
                let mean = v.iter().sum::<f64>() / v.len() as f64;
                (c, mean)
            })
            .collect();

        Self {
            models,
            samples: counts,
            mean_slopes,
        }
    }

    fn build_model(samples: &[Sample], comp: &Compound, cfg: &AnalysisConfig) -> Option<FittedLinearRegression> {
        let comp_data: Vec<_> = samples.iter().filter(|s| &s.compound == comp).collect();
        if comp_data.len() < cfg.min_fleet_laps {
            return None;
        }

        let feats: Vec<f64> = comp_data
            .iter()
            .flat_map(|s| [s.tyre_life, s.tyre_life.powi(2)])
            .collect();
        let targets: Vec<f64> = comp_data.iter().map(|s| s.delta).collect();

        let x = Array2::from_shape_vec((comp_data.len(), 2), feats).ok()?;
        let y = Array1::from_vec(targets);
        let ds = Dataset::new(x, y);

        match LinearRegression::new().fit(&ds) {
            Ok(model) => Some(model),
            Err(err) => {
                debug!(compound = %comp, error = %err, "fleet fit failed");
                None
            }
        }
    }

    /// Expected time lost to tyre wear at `tyre_life`, floored at zero.
    pub fn predict_delta(&self, compound: &Compound, tyre_life: u32) -> Option<f64> {
        let model = self.models.get(compound)?;
        let age = tyre_life as f64;
        let feats = Array2::from_shape_vec((1, 2), vec![age, age.powi(2)]).ok()?;
        let pred = model.predict(&feats)[0];
        pred.is_finite().then(|| pred.max(0.0))
    }

    pub fn mean_slope(&self, compound: &Compound) -> Option<f64> {
        self.mean_slopes.get(compound).copied()
    }

    pub fn summary(&self) -> Vec<CompoundSummary> {
        let mut compounds: Vec<&Compound> = self.samples.keys().collect();
        for c in self.mean_slopes.keys() {
            if !self.samples.contains_key(c) {
                compounds.push(c);
            }
        }
        compounds.sort();
        compounds
            .into_iter()
            .map(|c| CompoundSummary {
                compound: c.clone(),
                samples: self.samples.get(c).copied().unwrap_or(0),
                fitted: self.models.contains_key(c),
                mean_slope: self.mean_slope(c),
            })
            .collect()
    }
}
