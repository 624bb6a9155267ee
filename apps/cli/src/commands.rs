//! CLI command definitions, routing, and tracing setup.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use payscope_core::{GraphOptions, build_graph};
use payscope_index::{BenchmarkIndex, load_seed, populate_if_empty};
use payscope_inference::OpenRouterInference;
use payscope_search::CseClient;
use payscope_shared::{
    AppConfig, Estimate, init_config, load_config, validate_inference_key,
};
use tracing::{info, warn};

/// A sample profile for trying the tool without preparing input.
const EXAMPLE_PROFILE: &str = "\
John Smith
Senior Software Engineer at Google
San Francisco Bay Area

Experience:
- Senior Software Engineer, Google (2021-present): distributed systems for Google Cloud
- Software Engineer, Stripe (2018-2021): payments infrastructure
- Junior Developer, TechStartup Inc (2017-2018)

Education: M.S. Computer Science, Stanford University
Skills: Python, Go, Kubernetes, distributed systems, system design";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Payscope — estimate salaries from free-text profiles.
#[derive(Parser)]
#[command(
    name = "payscope",
    version,
    about = "Estimate a salary range from a free-text professional profile.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Estimate a salary from a profile (file, stdin, or built-in example).
    Estimate {
        /// Read the profile from a file instead of stdin.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Use a built-in example profile.
        #[arg(long, conflicts_with = "file")]
        example: bool,

        /// Emit the estimate as a single JSON line instead of pretty-printed.
        #[arg(long)]
        compact: bool,
    },

    /// Build the benchmark index from the seed dataset.
    InitKb {
        /// Seed dataset path (defaults to the configured seed path).
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "payscope=info",
        1 => "payscope=debug",
        _ => "payscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Estimate {
            file,
            example,
            compact,
        } => cmd_estimate(file.as_deref(), example, compact).await,
        Command::InitKb { seed } => cmd_init_kb(seed.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// estimate
// ---------------------------------------------------------------------------

async fn cmd_estimate(file: Option<&Path>, example: bool, compact: bool) -> Result<()> {
    let config = load_config()?;
    validate_inference_key(&config)?;

    let profile_text = read_profile_input(file, example)?;
    if profile_text.trim().is_empty() {
        return Err(eyre!(
            "no profile text provided — pass --file, --example, or pipe text on stdin"
        ));
    }

    let graph = assemble_graph(&config).await?;

    info!(bytes = profile_text.len(), "starting estimation run");
    let spinner = estimate_spinner();
    spinner.set_message("Estimating salary...");

    let result = graph.run(&profile_text).await;
    spinner.finish_and_clear();

    let state = match result {
        Ok(state) => state,
        Err(failure) => {
            return Err(eyre!("{failure}"));
        }
    };

    let estimate = state
        .estimate
        .ok_or_else(|| eyre!("pipeline completed without producing an estimate"))?;

    print_estimate(&estimate, compact)?;
    Ok(())
}

/// Resolve the profile text: example flag, file, or piped stdin.
fn read_profile_input(file: Option<&Path>, example: bool) -> Result<String> {
    if example {
        return Ok(EXAMPLE_PROFILE.to_string());
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read profile file '{}': {e}", path.display()));
    }
    if std::io::stdin().is_terminal() {
        return Err(eyre!(
            "no profile text provided — pass --file, --example, or pipe text on stdin"
        ));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| eyre!("cannot read stdin: {e}"))?;
    Ok(text)
}

/// Construct collaborators from config and assemble the pipeline.
async fn assemble_graph(config: &AppConfig) -> Result<payscope_core::StageGraph> {
    let inference_key = std::env::var(&config.inference.api_key_env).unwrap_or_default();
    let inference = OpenRouterInference::new(
        &config.inference.base_url,
        &inference_key,
        &config.inference.model,
    )?;

    let search_key = std::env::var(&config.search.api_key_env).unwrap_or_default();
    if search_key.is_empty() {
        warn!(
            var = %config.search.api_key_env,
            "search API key not set; web evidence will be empty"
        );
    }
    let provider = CseClient::new(&config.search.base_url, &search_key, &config.search.engine_id)?;

    let index = BenchmarkIndex::open(Path::new(&config.index.db_path)).await?;
    let seed = load_seed_or_empty(Path::new(&config.index.seed_path));

    let options = GraphOptions {
        max_queries: config.limits.max_queries,
        results_per_query: config.search.results_per_query,
    };

    let graph = build_graph(
        Arc::new(inference),
        Arc::new(provider),
        Arc::new(index),
        seed,
        &options,
    )?;
    Ok(graph)
}

/// Load the seed dataset, degrading to an empty set when unavailable.
fn load_seed_or_empty(path: &Path) -> Vec<payscope_shared::Benchmark> {
    match load_seed(path) {
        Ok(seed) => seed,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "seed dataset unavailable");
            Vec::new()
        }
    }
}

fn estimate_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

fn print_estimate(estimate: &Estimate, compact: bool) -> Result<()> {
    if compact {
        println!("{}", serde_json::to_string(estimate)?);
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(estimate)?);
    println!();
    println!(
        "  {} — {} ({} years, {})",
        estimate.profile_summary.title,
        estimate.profile_summary.company,
        estimate.profile_summary.years_of_experience,
        estimate.profile_summary.location
    );
    println!(
        "  Range:      {} {} - {} (median {})",
        estimate.salary_estimate.currency,
        estimate.salary_estimate.min,
        estimate.salary_estimate.max,
        estimate.salary_estimate.median
    );
    println!(
        "  Confidence: {} ({:.2}, {} data points)",
        estimate.confidence.level, estimate.confidence.score, estimate.confidence.data_points
    );
    println!("  Sources:    {}", estimate.sources.join(", "));
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// init-kb
// ---------------------------------------------------------------------------

async fn cmd_init_kb(seed: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let seed_path = seed.unwrap_or_else(|| Path::new(&config.index.seed_path));

    let benchmarks = load_seed(seed_path)?;
    info!(
        records = benchmarks.len(),
        path = %seed_path.display(),
        "loaded seed dataset"
    );

    let index = BenchmarkIndex::open(Path::new(&config.index.db_path)).await?;
    let count = populate_if_empty(&index, &benchmarks).await?;

    println!("Benchmark index ready at: {}", config.index.db_path);
    println!("Records: {count}");
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
