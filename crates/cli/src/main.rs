//! Spectra CLI - yearly spectral index means for an area of interest
//!
//! Prints exactly one line of JSON on stdout: either the per-year index
//! mapping or `{"error": "..."}`. Logs go to stderr.

mod failure;

use anyhow::{anyhow, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use failure::Failure;
use spectra_cloud::auth::ServiceAccountKey;
use spectra_cloud::{evaluate, expressions, plan, EeConfig, EeSession};
use spectra_core::{IndexParams, IndexRequest};

#[derive(Parser)]
#[command(name = "spectra")]
#[command(author, version, about = "Yearly spectral index means over a polygon, computed on Earth Engine", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the expression graph for each year instead of evaluating it
    #[arg(long)]
    dry_run: bool,

    /// Reduction scale in meters
    #[arg(long, default_value = "10")]
    scale: f64,

    /// Maximum cloudy-pixel percentage of a scene
    #[arg(long, default_value = "20")]
    max_cloud: f64,

    /// Request JSON: {"geometry": [{"geometry": <GeoJSON>}], "years": [...]}
    #[arg(allow_hyphen_values = true, allow_negative_numbers = true)]
    request: Option<String>,

    /// Arguments after the request are ignored
    #[arg(hide = true, allow_hyphen_values = true)]
    ignored: Vec<String>,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: &Cli) -> Result<String> {
    if !cli.ignored.is_empty() {
        debug!(count = cli.ignored.len(), "ignoring extra arguments");
    }

    let config = EeConfig::from_env()?;
    let key = ServiceAccountKey::from_file(&config.credentials_path)?;
    debug!(project = %config.project_id, account = %key.client_email, "configuration loaded");

    let text = cli
        .request
        .as_deref()
        .ok_or_else(|| anyhow!("missing request argument"))?;
    let request = IndexRequest::from_json(text)?;
    let params = IndexParams {
        scale_m: cli.scale,
        max_cloud_pct: cli.max_cloud,
        ..IndexParams::default()
    };

    let bundles = plan(&request, &params)?;

    if cli.dry_run {
        return Ok(serde_json::to_string(&expressions(&bundles)?)?);
    }
    if bundles.is_empty() {
        info!("no years requested");
        return Ok("{}".to_string());
    }

    let start = Instant::now();
    let session = EeSession::connect_with_key(&config, &key)?;
    let results = evaluate(&session, &bundles)?;
    info!(
        years = results.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "indices computed"
    );

    Ok(serde_json::to_string(&results)?)
}

fn report(failure: Failure) -> ExitCode {
    error!(kind = ?failure.kind, "{}", failure.message);
    println!("{}", failure.to_json());
    ExitCode::from(failure.kind.exit_status())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            setup_logging(false);
            return report(Failure::usage(&e));
        }
    };
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(err) => report(Failure::classify(&err)),
    }
}
