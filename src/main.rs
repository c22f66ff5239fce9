//! CLI for hotelling: T² tests and control charts on delimited data files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::debug;

use hotelling::config::{ChartConfig, LoadOptions};
use hotelling::error::{HotellingError, Result};
use hotelling::loader::load_table;
use hotelling::spc::{HotellingChart, Phase, UnivariateChart};
use hotelling::table::ObservationTable;
use hotelling::testing::{hotelling_report, Comparand};

#[derive(Parser)]
#[command(name = "hotelling")]
#[command(about = "Hotelling's T² tests and multivariate control charts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One- or two-sample T² test. Prints the report as JSON.
    Test {
        #[command(flatten)]
        input: Input,

        /// Second sample for a two-sample test
        #[arg(long)]
        y: Option<PathBuf>,

        /// Hypothesized mean for a one-sample test, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with = "y")]
        mu: Option<Vec<f64>>,

        /// Pool covariances with raw row counts instead of n - 1
        #[arg(long)]
        no_bessel: bool,
    },

    /// T² or univariate control chart data as JSON.
    Chart {
        #[command(flatten)]
        input: Input,

        /// JSON file with chart options; flags override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Chart phase
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        phase: Option<u8>,

        /// Significance level of the T² limits
        #[arg(long)]
        alpha: Option<f64>,

        /// Add a CUSUM trace
        #[arg(long)]
        cusum: bool,

        /// Chart each feature against mean ± k·σ instead of T²
        #[arg(long)]
        univariate: bool,

        /// k for univariate limits
        #[arg(long)]
        sigma: Option<f64>,

        /// Univariate chart of a single feature (zero-based)
        #[arg(long, requires = "univariate")]
        feature: Option<usize>,

        /// Maximum number of displayed points
        #[arg(long)]
        limit: Option<usize>,

        /// Seed of the display subsample
        #[arg(long)]
        seed: Option<u64>,

        /// Output file, or "stdout"
        #[arg(long, default_value = "stdout")]
        output: String,
    },
}

#[derive(Args)]
struct Input {
    /// Observations file (comma or whitespace delimited)
    #[arg(long)]
    x: PathBuf,

    /// Read the data lazily in partitions of this many rows
    #[arg(long)]
    chunk_rows: Option<usize>,

    /// Zero-based column of row labels to drop
    #[arg(long)]
    index_col: Option<usize>,
}

impl Input {
    fn options(&self) -> LoadOptions {
        LoadOptions {
            chunk_rows: self.chunk_rows,
            index_col: self.index_col,
            ..LoadOptions::default()
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error ({}): {e}", e.kind());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Test {
            input,
            y,
            mu,
            no_bessel,
        } => {
            let options = input.options();
            let x = load_table(&input.x, &options)?;
            let y = y.map(|path| load_table(path, &options)).transpose()?;
            let comparand = match (&y, &mu) {
                (Some(y), _) => Comparand::Sample(y),
                (None, Some(mu)) => Comparand::Mean(mu),
                (None, None) => Comparand::Origin,
            };
            let report = hotelling_report(&x, comparand, !no_bessel)?;
            emit(&report, "stdout")
        }
        Commands::Chart {
            input,
            config,
            phase,
            alpha,
            cusum,
            univariate,
            sigma,
            feature,
            limit,
            seed,
            output,
        } => {
            let mut chart_config = match config {
                Some(path) => ChartConfig::from_file(path)?,
                None => ChartConfig::default(),
            };
            if let Some(phase) = phase {
                chart_config.phase = Phase::try_from(phase)?;
            }
            if let Some(alpha) = alpha {
                chart_config.alpha = alpha;
            }
            if let Some(sigma) = sigma {
                chart_config.sigma = sigma;
            }
            if let Some(limit) = limit {
                chart_config.display_limit = limit;
            }
            if let Some(seed) = seed {
                chart_config.seed = seed;
            }
            if feature.is_some() {
                chart_config.feature = feature;
            }
            chart_config.cusum |= cusum;

            let x = load_table(&input.x, &input.options())?;
            debug!(
                "charting {} features, lazy: {}",
                x.feature_count(),
                x.is_lazy()
            );
            if univariate {
                emit(&UnivariateChart::build(&x, &chart_config)?, &output)
            } else {
                emit(&HotellingChart::build(&x, None, None, &chart_config)?, &output)
            }
        }
    }
}

fn emit<T: serde::Serialize>(value: &T, output: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| HotellingError::Numeric(format!("cannot serialize output: {e}")))?;
    if output == "stdout" {
        println!("{json}");
    } else {
        std::fs::write(output, json + "\n")?;
    }
    Ok(())
}
