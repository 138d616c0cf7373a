use anyhow::{anyhow, bail, Context, Result};
use std::io;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tyre_insights::fleet::FleetDegradation;
use tyre_insights::{analyze_all, AnalysisConfig, LapLoader, SessionContext, SessionKind};

const USAGE: &str = "usage: tyre_insights <laps.csv> [--session R|S|Q|SQ] [--config cfg.json] [--year N] [--circuit NAME]";

struct Args {
    laps_path: String,
    session: SessionKind,
    config_path: Option<String>,
    year: u16,
    circuit: String,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut laps_path = None;
    let mut session = SessionKind::Race;
    let mut config_path = None;
    let mut year = 2024;
    let mut circuit = String::from("unknown");

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| anyhow!("{flag} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--session" => {
                let code = value("--session")?;
                session = SessionKind::from_code(&code)
                    .ok_or_else(|| anyhow!("unknown session code {code:?}"))?;
            }
            "--config" => config_path = Some(value("--config")?),
            "--year" => year = value("--year")?.parse().context("--year is not a number")?,
            "--circuit" => circuit = value("--circuit")?,
            "-h" | "--help" => bail!(USAGE),
            _ if laps_path.is_none() => laps_path = Some(arg),
            _ => bail!("unexpected argument {arg:?}\n{USAGE}"),
        }
    }

    Ok(Args {
        laps_path: laps_path.ok_or_else(|| anyhow!(USAGE))?,
        session,
        config_path,
        year,
        circuit,
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let args = parse_args()?;
    let cfg = match &args.config_path {
        Some(path) => AnalysisConfig::load(path).with_context(|| format!("loading config {path}"))?,
        None => AnalysisConfig::default(),
    };
    let ctx = SessionContext::new(args.year, args.circuit, args.session);

    // Load the lap table and split it per driver.
    let loaded = LapLoader::from_path(&args.laps_path)
        .with_context(|| format!("loading laps from {}", args.laps_path))?;
    for (driver, err) in &loaded.rejected {
        warn!(driver = %driver, error = %err, "driver skipped");
    }
    if loaded.series.is_empty() {
        bail!("no usable driver data in {}", args.laps_path);
    }

    let analyses = analyze_all(&loaded.series, &loaded.positions, ctx.session, &cfg);
    info!(
        year = ctx.year,
        circuit = %ctx.circuit,
        session = ?ctx.session,
        drivers = analyses.len(),
        "session analysed"
    );

    // Compound-level view across the whole field, logged only.
    let all: Vec<_> = analyses.values().collect();
    let fleet = FleetDegradation::from_analyses(&all, &cfg);
    for c in fleet.summary() {
        info!(
            compound = %c.compound,
            samples = c.samples,
            fitted = c.fitted,
            mean_slope = c.mean_slope.unwrap_or(0.0),
            "fleet degradation"
        );
    }

    let out = serde_json::to_string_pretty(&analyses).context("serialising analyses")?;
    println!("{out}");
    Ok(())
}
