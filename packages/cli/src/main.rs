#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line tools for preparing crash risk training data.
//!
//! - `sample`: draw synthetic non-event records matched to traffic
//!   exposure and seasonality.
//! - `severity`: encode a crash table's injury counts into one label and
//!   print the resulting severity prior.
//! - `balance`: resample an encoded crash table to equal class sizes.
//! - `buckets`: show the time-of-day bucket for every hour.
//! - `weather`: fetch the observation used for a location and time.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use crash_risk_road_models::{Coordinates, TimeOfDay};
use crash_risk_sampler::inventory;
use crash_risk_sampler::mix::ClassMix;
use crash_risk_sampler::priors::{self, DEFAULT_YEARS, SeasonalityPriors};
use crash_risk_sampler::sampler::ControlSampler;
use crash_risk_severity::{prior, table};
use crash_risk_severity_models::{SEVERITY_CLASS_COUNT, SeverityClass};
use crash_risk_weather::WeatherService as _;
use crash_risk_weather::client::WeatherComClient;
use crash_risk_weather::config::WeatherConfig;
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "crash-risk", about = "Crash risk data preparation tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample synthetic non-event records
    Sample {
        /// Road inventory CSV (`STR_UNQ_ID`, `AADT_DESGN`, `RU_F_SYSTE`)
        #[arg(long)]
        inventory: PathBuf,

        /// Monthly traffic seasonality CSV (label column + 12 months)
        #[arg(long)]
        monthly: PathBuf,

        /// Weekday x hour traffic intensity CSV
        #[arg(long)]
        hourly: PathBuf,

        /// Crash CSV; one control record is drawn per crash row
        #[arg(long, required_unless_present = "count")]
        crashes: Option<PathBuf>,

        /// Number of control records (overrides `--crashes`)
        #[arg(long)]
        count: Option<usize>,

        /// Candidate years, drawn uniformly
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_YEARS)]
        years: Vec<i32>,

        /// RNG seed; random (and logged) when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV
        #[arg(long)]
        out: PathBuf,
    },
    /// Encode injury counts into a single severity label
    Severity {
        /// Crash CSV with the six injury count columns
        #[arg(long)]
        input: PathBuf,

        /// Output CSV with a `target` column
        #[arg(long)]
        out: PathBuf,

        /// Keep rows whose label is 0
        #[arg(long)]
        keep_invalid: bool,
    },
    /// Resample an encoded crash table to equal class sizes
    Balance {
        /// Encoded crash CSV with a `target` column
        #[arg(long)]
        input: PathBuf,

        /// Output CSV
        #[arg(long)]
        out: PathBuf,

        /// RNG seed; random (and logged) when omitted
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the time-of-day bucket for every hour
    Buckets,
    /// Fetch weather for a location and date
    Weather {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Time of day (HH:MM); uses the closest reading instead of the
        /// latest
        #[arg(long)]
        at: Option<NaiveTime>,

        /// Weather service TOML; the built-in configuration when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sample {
            inventory: inventory_path,
            monthly,
            hourly,
            crashes,
            count,
            years,
            seed,
            out,
        } => {
            let n = match (count, crashes) {
                (Some(n), _) => n,
                (None, Some(path)) => inventory::count_records(File::open(path)?)?,
                (None, None) => return Err("either --crashes or --count is required".into()),
            };
            let seasonality = SeasonalityPriors {
                monthly: priors::load_monthly(File::open(monthly)?)?,
                weekday_hour: priors::load_weekday_hour(File::open(hourly)?)?,
                years,
            };
            sample(&inventory_path, seasonality, n, seed, &out)?;
        }
        Commands::Severity {
            input,
            out,
            keep_invalid,
        } => encode_severity(&input, &out, !keep_invalid)?,
        Commands::Balance { input, out, seed } => {
            let mut rng = seeded_rng(seed);
            let counts = table::balance_csv(File::open(input)?, File::create(&out)?, &mut rng)?;
            for class in SeverityClass::PRECEDENCE {
                log::info!("  {class}: {}", counts[class.index()]);
            }
            log::info!("Balanced table written to {}", out.display());
        }
        Commands::Buckets => print_buckets()?,
        Commands::Weather {
            lat,
            lon,
            date,
            at,
            config,
        } => {
            let config = match config {
                Some(path) => WeatherConfig::from_path(&path)?,
                None => WeatherConfig::embedded()?,
            };
            let client = WeatherComClient::new(config)?;
            let location = Coordinates {
                latitude: lat,
                longitude: lon,
            };
            let observation = match at {
                Some(time) => client.observe_at(location, date.and_time(time)).await?,
                None => client.observe(location, date).await?,
            };
            for (name, value) in observation.features() {
                println!("{name} = {value}");
            }
        }
    }

    Ok(())
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    let seed = seed.unwrap_or_else(rand::random);
    log::info!("Using RNG seed {seed}");
    ChaCha8Rng::seed_from_u64(seed)
}

/// Samples `n` control records and writes them to `out`.
fn sample(
    inventory_path: &Path,
    seasonality: SeasonalityPriors,
    n: usize,
    seed: Option<u64>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let segments = inventory::read_segments(File::open(inventory_path)?)?;
    let mut rng = seeded_rng(seed);

    let events = ControlSampler::new(seasonality).sample(&segments, n, &mut rng)?;

    log::info!(
        "Road class mix by segment count: {}",
        ClassMix::of_segment_counts(&segments).describe()
    );
    log::info!(
        "Road class mix by AADT:          {}",
        ClassMix::of_aadt(&segments).describe()
    );
    log::info!(
        "Road class mix of controls:      {}",
        ClassMix::of_events(&events).describe()
    );

    inventory::write_events(&events, File::create(out)?)?;
    log::info!("Wrote {} control records to {}", events.len(), out.display());
    Ok(())
}

#[derive(Serialize)]
struct PriorToml {
    severity_prior: [f64; SEVERITY_CLASS_COUNT],
}

/// Encodes a crash table and prints the observed severity prior in
/// calibration TOML form.
fn encode_severity(
    input: &Path,
    out: &Path,
    drop_invalid: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = table::encode_csv(File::open(input)?, File::create(out)?, drop_invalid)?;
    if summary.invalid > 0 {
        log::warn!(
            "{} rows had no assignable severity{}",
            summary.invalid,
            if drop_invalid { " and were dropped" } else { "" }
        );
    }

    let severity_prior = prior::prior_from_counts(&summary.class_counts)?;
    print!("{}", toml::to_string(&PriorToml { severity_prior })?);
    Ok(())
}

fn print_buckets() -> Result<(), Box<dyn std::error::Error>> {
    for hour in 0..24 {
        let bucket = TimeOfDay::from_hour(hour).map_err(|h| format!("hour {h} has no bucket"))?;
        println!("{hour:02}:00  {}", bucket.column());
    }
    Ok(())
}
