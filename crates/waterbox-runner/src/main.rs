//! waterbox CLI - water area inside a bounding box from Dynamic World

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use waterbox_ee::{EarthEngineClient, EeError};
use waterbox_geo::GeoError;
use waterbox_runner::present::{
    DEFAULT_END, DEFAULT_MAX_LAT, DEFAULT_MAX_LON, DEFAULT_MIN_LAT, DEFAULT_MIN_LON, DEFAULT_START,
};
use waterbox_runner::{
    error_report, format_area_line, render_overlay, run_interactive, AppConfig, AreaError,
    AreaQueryClient, ConfigError, QueryInputs,
};

#[derive(Parser)]
#[command(name = "waterbox")]
#[command(author, version, about = "Water surface area inside a bounding box", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service-account key file (otherwise read from $GEE_SERVICE_ACCOUNT_KEY)
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    /// Earth Engine project (defaults to the key's project)
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(flatten)]
    query: QueryArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct QueryArgs {
    /// First day of the date range (YYYY-MM-DD)
    #[arg(long, global = true, default_value = DEFAULT_START)]
    start: NaiveDate,

    /// Last day of the date range (YYYY-MM-DD)
    #[arg(long, global = true, default_value = DEFAULT_END)]
    end: NaiveDate,

    /// Western edge in degrees
    #[arg(long, global = true, allow_negative_numbers = true, default_value_t = DEFAULT_MIN_LON)]
    min_lon: f64,

    /// Southern edge in degrees
    #[arg(long, global = true, allow_negative_numbers = true, default_value_t = DEFAULT_MIN_LAT)]
    min_lat: f64,

    /// Eastern edge in degrees
    #[arg(long, global = true, allow_negative_numbers = true, default_value_t = DEFAULT_MAX_LON)]
    max_lon: f64,

    /// Northern edge in degrees
    #[arg(long, global = true, allow_negative_numbers = true, default_value_t = DEFAULT_MAX_LAT)]
    max_lat: f64,
}

impl QueryArgs {
    fn inputs(&self) -> QueryInputs {
        QueryInputs {
            start: self.start,
            end: self.end,
            min_lon: self.min_lon,
            min_lat: self.min_lat,
            max_lon: self.max_lon,
            max_lat: self.max_lat,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the water area for one query (default)
    Area,
    /// Print the water area and write a map of the water mask
    Map {
        /// Output HTML file
        #[arg(short, long, default_value = "water_map.html")]
        output: PathBuf,
    },
    /// Read queries from stdin, one per line
    Interactive,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not start an Earth Engine session")]
    Session(#[source] EeError),

    #[error(transparent)]
    Input(#[from] GeoError),

    #[error(transparent)]
    Area(#[from] AreaError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "prometheus")]
fn init_metrics() {
    if let Err(e) = waterbox_metrics::install_prometheus_exporter() {
        tracing::warn!("Prometheus exporter not installed: {}", e);
    }
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics() {
    waterbox_metrics::describe_metrics();
}

fn load_config(cli: &Cli) -> Result<AppConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };
    if cli.key_file.is_some() {
        config.key_file = cli.key_file.clone();
    }
    if cli.project.is_some() {
        config.project = cli.project.clone();
    }
    Ok(config)
}

fn connect(config: &AppConfig) -> Result<EarthEngineClient, CliError> {
    let key = config.secret_store().load_key().map_err(CliError::Session)?;
    let client =
        EarthEngineClient::connect(key, &config.client_config()).map_err(CliError::Session)?;
    info!(
        "Authenticated as {} (project {})",
        client.session().client_email(),
        client.project()
    );
    Ok(client)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;
    let inputs = cli.query.inputs();

    // Bad input fails before any network traffic.
    let (range, bbox) = inputs.validate()?;

    let service = connect(&config)?;
    let mut client = AreaQueryClient::new(&service, config.query_settings());
    if let Some(cache) = config.query_cache() {
        client = client.with_cache(cache);
    }

    match cli.command.unwrap_or(Commands::Area) {
        Commands::Area => {
            let area = client.water_area(&range, &bbox)?;
            println!("{}", format_area_line(area.square_kilometers));
        }
        Commands::Map { output } => {
            let area = client.water_area(&range, &bbox)?;
            println!("{}", format_area_line(area.square_kilometers));

            let mask = client.water_mask(&range, &bbox);
            let overlay = render_overlay(client.service(), &mask, &bbox, &config.overlay_style())?;
            overlay.write_html(&output)?;
            println!("Map written to {}", output.display());
        }
        Commands::Interactive => {
            let stdin = io::stdin();
            let summary = run_interactive(&client, inputs, stdin.lock(), io::stdout())?;
            info!(
                "Session finished: {} answered, {} failed",
                summary.answered, summary.failed
            );
        }
    }

    let stats = service.request_stats();
    debug!(
        "{} request(s), {} bytes received",
        stats.requests, stats.bytes_received
    );
    if let Some(cache) = client.cache() {
        debug!("Cache stats: {:?}", cache.stats());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    init_metrics();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", error_report(&e));
            ExitCode::FAILURE
        }
    }
}

