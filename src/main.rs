//! eplusout CLI
//!
//! Command-line interface for reading simulation outputs:
//! - Query results and print or export them
//! - List declared variables
//! - List environments of an ESO file
//! - Generate a default config file

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use eplusout::config::{generate_default_config, Config, LoggingConfig};
use eplusout::eso::{parse_eso_environments, parse_eso_file, ParseOptions};
use eplusout::query::{open_source, ExportOptions, ResultsRequest, ResultsView, SourceKind, TIMESTAMP_FORMAT};
use eplusout::sql::SqlFile;
use eplusout::storage::{is_missing, Frequency, Timestamp, Variable};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "eplusout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Read EnergyPlus ESO and SQL output files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./eplusout.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Calendar year of the first step (overrides config)
    #[arg(short, long, global = true)]
    pub year: Option<i32>,

    /// Log level (overrides config)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query results of an ESO or SQL file
    Results {
        /// Path to eplusout.eso or eplusout.sql
        path: PathBuf,
        /// Frequency (timestep, hourly, daily, monthly, annual, runperiod)
        #[arg(short, long)]
        frequency: String,
        /// Variable key (any when omitted)
        #[arg(short, long)]
        key: Option<String>,
        /// Variable type (any when omitted)
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,
        /// Variable units (any when omitted)
        #[arg(short, long)]
        units: Option<String>,
        /// Match key, type and units by substring
        #[arg(short, long)]
        alike: bool,
        /// First timestamp, inclusive ("2002-01-01" or "2002-01-01 01:00:00")
        #[arg(long)]
        start: Option<String>,
        /// Last timestamp, inclusive
        #[arg(long)]
        end: Option<String>,
        /// Output format (table, json, csv)
        #[arg(long, default_value = "table")]
        format: String,
        /// Write a CSV file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Title row of the CSV file
        #[arg(long)]
        title: Option<String>,
        /// Write key, type and units as three header rows
        #[arg(long)]
        explode_header: bool,
        /// Append to the CSV file instead of replacing it; printed CSV
        /// leaves out the title and header rows
        #[arg(long)]
        append: bool,
    },

    /// List declared variables
    Variables {
        path: PathBuf,
        /// Only variables of this frequency
        #[arg(short, long)]
        frequency: Option<String>,
    },

    /// List environments of an ESO file
    Environments { path: PathBuf },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("eplusout={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(year) = cli.year {
        config.reader.year = Some(year);
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn parse_timestamp(text: &str) -> anyhow::Result<Timestamp> {
    let text = text.trim();
    if let Ok(timestamp) = Timestamp::parse_from_str(text, TIMESTAMP_FORMAT) {
        return Ok(timestamp);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .with_context(|| format!("Invalid timestamp {:?}", text))
}

fn parse_frequency(text: &str) -> anyhow::Result<Frequency> {
    text.parse::<Frequency>()
        .map_err(|f| anyhow::anyhow!("Unknown frequency {:?}", f))
}

fn print_table(view: &ResultsView) {
    let mut header = format!("{:<20}", "timestamp");
    for variable in view.variables() {
        header.push_str(&format!("  {}", variable));
    }
    println!("{}", header);
    println!("{}", "-".repeat(header.len().min(120)));

    for (i, timestamp) in view.time_series().iter().enumerate() {
        let mut row = format!("{:<20}", timestamp.format(TIMESTAMP_FORMAT));
        for array in view.arrays() {
            match array.get(i) {
                Some(v) if !is_missing(*v) => row.push_str(&format!("  {:>12.4}", v)),
                _ => row.push_str(&format!("  {:>12}", "-")),
            }
        }
        println!("{}", row);
    }
}

/// CSV options from config, overridden by command-line flags
fn csv_options(
    config: &Config,
    title: Option<String>,
    explode_header: bool,
    append: bool,
) -> anyhow::Result<ExportOptions> {
    let mut export = config.export.export_options()?;
    export.explode_header |= explode_header;
    export.append = append;
    export.title = title;
    Ok(export)
}

/// Declared `(index, variable, frequency)` entries of an ESO or SQL file
fn declared_variables(
    path: &Path,
    options: &ParseOptions,
    frequency: Option<Frequency>,
) -> anyhow::Result<Vec<(i64, Variable, Frequency)>> {
    let listed: Vec<(i64, Variable, Frequency)> = match SourceKind::from_path(path) {
        Some(SourceKind::Eso) => parse_eso_file(path, options)?
            .records()
            .into_iter()
            .map(|r| (i64::from(r.id), r.variable.clone(), r.frequency))
            .collect(),
        Some(SourceKind::Sql) => SqlFile::open(path)?
            .records()?
            .into_iter()
            .map(|r| (r.index, r.variable, r.frequency))
            .collect(),
        None => bail!("Unsupported file: {:?}", path),
    };

    Ok(listed
        .into_iter()
        .filter(|(_, _, f)| frequency.map_or(true, |wanted| *f == wanted))
        .collect())
}

fn list_variables(path: &Path, options: &ParseOptions, frequency: Option<Frequency>) -> anyhow::Result<()> {
    let listed = declared_variables(path, options, frequency)?;
    if listed.is_empty() {
        println!("No variables found.");
        return Ok(());
    }
    println!("{:<8} {:<10} {}", "ID", "Frequency", "Variable");
    println!("{}", "-".repeat(60));
    for (id, variable, frequency) in listed {
        println!("{:<8} {:<10} {}", id, frequency, variable);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging);

    let options = config.reader.parse_options();

    match cli.command {
        Commands::Results {
            path,
            frequency,
            key,
            type_name,
            units,
            alike,
            start,
            end,
            format,
            output,
            title,
            explode_header,
            append,
        } => {
            let filter = Variable {
                key,
                type_name,
                units,
            };
            let mut request = ResultsRequest::new([filter], parse_frequency(&frequency)?).alike(alike);
            if let Some(start) = start {
                request = request.start(parse_timestamp(&start)?);
            }
            if let Some(end) = end {
                request = request.end(parse_timestamp(&end)?);
            }

            let source = open_source(&path, &options)
                .with_context(|| format!("Failed to open {:?}", path))?;
            let view = source.get_results(&request)?;
            tracing::info!(
                variables = view.len(),
                steps = view.time_series().len(),
                "Results ready"
            );

            let export = csv_options(&config, title, explode_header, append)?;

            if let Some(output) = output {
                view.to_csv(&output, &export)?;
                println!("Exported {} variables to {:?}", view.len(), output);
                return Ok(());
            }

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&view)?),
                "csv" => view.write_csv(std::io::stdout().lock(), &export, !export.append)?,
                "table" => {
                    if view.is_empty() {
                        println!("No matching variables.");
                    } else {
                        print_table(&view);
                    }
                }
                other => bail!("Unknown output format {:?}", other),
            }
        }

        Commands::Variables { path, frequency } => {
            let frequency = frequency.as_deref().map(parse_frequency).transpose()?;
            list_variables(&path, &options, frequency)?;
        }

        Commands::Environments { path } => {
            if SourceKind::from_path(&path) != Some(SourceKind::Eso) {
                bail!("Environments can only be listed for ESO files");
            }
            let stores = parse_eso_environments(&path, &options)?;
            for (i, store) in stores.iter().enumerate() {
                println!(
                    "{:>3}  {:<40} {} warnings",
                    i + 1,
                    store.environment_name().unwrap_or("-"),
                    store.warnings().len()
                );
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}
