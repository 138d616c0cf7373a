use thiserror::Error;

/// Input that breaks the lap-series invariants. The engine refuses to analyse it
/// instead of producing wrong numbers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("driver identifier is empty")]
    EmptyDriverId,
    #[error("{driver}: lap number {lap} is not positive")]
    NonPositiveLap { driver: String, lap: u32 },
    #[error("{driver}: lap {lap} does not follow lap {previous}")]
    NonIncreasingLap { driver: String, previous: u32, lap: u32 },
    #[error("{driver}: lap {lap} has non-positive lap time {lap_time}")]
    NonPositiveLapTime { driver: String, lap: u32, lap_time: f64 },
    #[error("{driver}: lap {lap} has negative speed {speed}")]
    NegativeSpeed { driver: String, lap: u32, speed: f64 },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed lap csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}
