use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use city_registry::config::{Settings, SettingsLayer};
use city_registry::registry::{
    summarize, Checkpoint, CheckpointState, Geocoder, Pipeline, RunOutcome, TzfLookup, YandexGeocoder,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// City registry builder: FIAS + hh.ru areas → Data/Cities.json
///
/// The first run merges the two source datasets into the registry. Every
/// later run geocodes up to --quota cities that still lack coordinates and
/// refreshes time zones from coordinates.
///
/// Examples:
///   cities
///   cities --api-key $KEY --quota 100
///   cities --data-dir ./Data --status
#[derive(Parser)]
#[command(name = "cities", version, about, long_about = None)]
struct Cli {
    /// Yandex geocoder API key (needed once the registry exists).
    #[arg(long, env = "CITIES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// hh.ru area id of the country to build.
    #[arg(long)]
    country_id: Option<String>,

    /// Maximum geocoder requests per run.
    #[arg(long)]
    quota: Option<usize>,

    /// Pause before each geocoder request, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Directory holding Fias.json, AllCities.json and Cities.json.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Settings file (JSON). Defaults to appsettings.json if present.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Print registry progress and exit without building or geocoding.
    #[arg(long)]
    status: bool,

    /// Debug-level logging.
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> SettingsLayer {
        SettingsLayer {
            api_key: self.api_key.clone(),
            country_id: self.country_id.clone(),
            request_quota: self.quota,
            request_delay_ms: self.delay_ms,
            data_dir: self.data_dir.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref(), cli.overrides()).context("Failed to load settings")?;
    let checkpoint = Checkpoint::new(settings.registry_path());

    if cli.status {
        return print_status(&checkpoint);
    }

    let zones = TzfLookup::new();
    let geocoder = settings.api_key.as_deref().map(|key| YandexGeocoder::new(key));
    let pipeline = Pipeline::new(settings.sources(), settings.country_id.clone(), settings.limits(), &zones);

    let outcome = pipeline
        .run(&checkpoint, geocoder.as_ref().map(|g| g as &dyn Geocoder))
        .with_context(|| format!("Run failed; {} left unchanged", checkpoint.path().display()))?;

    match outcome {
        RunOutcome::Built(country) => info!(
            "Registry built: {} regions, {} cities, {} awaiting geocoding",
            country.regions.len(),
            country.city_count(),
            country.pending_count(),
        ),
        RunOutcome::Enriched(country, report) => info!(
            "Operation complete: {}; {} cities still pending",
            report,
            country.pending_count(),
        ),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn print_status(checkpoint: &Checkpoint) -> Result<()> {
    match checkpoint.load()? {
        CheckpointState::Unbuilt => {
            println!("No registry at {} yet; the next run builds it.", checkpoint.path().display());
        }
        CheckpointState::Built(country) => {
            print!("{}", summarize(&country, 5));
        }
    }
    Ok(())
}
