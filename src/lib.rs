//! Per-driver tyre analytics over lap data: traffic laps, stints, pit stops,
//! degradation slopes and a summary card per driver.

pub mod config;
pub mod data;
pub mod error;
pub mod fleet;
pub mod insight;
pub mod model;
pub mod pipeline;
pub mod pit;
pub mod session;
pub mod stint;
pub mod traffic;

pub use config::AnalysisConfig;
pub use data::{Compound, DriverSeries, LapLoader, LapRecord, SessionContext, SessionKind};
pub use error::{AnalysisError, LoadError};
pub use pipeline::{analyze_all, analyze_driver, DriverAnalysis};
