//! Submetric SPC Engine - CLI shell
//!
//! A thin JSON-in/JSON-out driver around the pure analysis engine:
//! - `analyze` runs a full pass over a series file
//! - `check` validates a configuration file
//! - `version` prints schema and engine versions
//!
//! stdout carries command payloads only; logs go to stderr.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use spc_common::{Error, LimitMode, Observation, OutputFormat, StructuredError, SCHEMA_VERSION};
use spc_core::config::EngineConfig;
use spc_core::exit_codes::ExitCode;
use spc_core::logging::init_logging;
use spc_core::overlay::OverlayState;
use spc_core::report::{analyze, auto_lock_overlay, AnalysisOptions};
use spc_core::seasonality::Period;

/// Submetric SPC Engine - control limits, run rules, and overlays
#[derive(Parser)]
#[command(name = "spc-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to an engine configuration file (TOML)
    #[arg(long, global = true, env = "SPC_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full analysis pass over a series file
    Analyze(AnalyzeArgs),

    /// Validate an engine configuration file
    Check(CheckArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Path to a JSON array of {timestamp, value, confidence?} rows
    input: PathBuf,

    /// Central-tendency mode for limit computation
    #[arg(long, value_enum, default_value_t = LimitMode::Mean)]
    mode: LimitMode,

    /// Overlay linear trend limits
    #[arg(long, conflicts_with_all = ["seasonal", "auto_lock"])]
    trend: bool,

    /// Overlay seasonal adjustment with the given period
    #[arg(long, value_enum, conflicts_with_all = ["trend", "auto_lock"])]
    seasonal: Option<Period>,

    /// Sum values sharing a period cell before factor computation
    #[arg(long, requires = "seasonal")]
    grouped: bool,

    /// Lock limits onto the outlier-cleaned baseline when warranted
    #[arg(long, conflicts_with_all = ["trend", "seasonal"])]
    auto_lock: bool,

    /// Interior dividers to place at span quartiles (0-3)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    dividers: u8,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Configuration file to validate (defaults to --config)
    #[arg(long)]
    file: Option<PathBuf>,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet);

    let code = match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", StructuredError::from(&err).to_json());
            match err {
                Error::Config(_) | Error::InvalidConfigValue { .. } => ExitCode::ConfigError,
                Error::InvalidLockedLimits { .. } => ExitCode::ValidationError,
                Error::SeriesParse(_) => ExitCode::InputError,
                Error::Io(_) | Error::Json(_) => ExitCode::InputError,
            }
        }
    };
    code.into()
}

fn run(cli: &Cli) -> Result<ExitCode, Error> {
    let config = load_config(cli.global.config.as_deref())?;

    match &cli.command {
        Commands::Analyze(args) => cmd_analyze(args, &cli.global, &config),
        Commands::Check(args) => cmd_check(args, &cli.global),
        Commands::Version => {
            println!(
                "spc-core {} (schema {})",
                env!("CARGO_PKG_VERSION"),
                SCHEMA_VERSION
            );
            Ok(ExitCode::Clean)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig, Error> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

fn read_series(path: &std::path::Path) -> Result<Vec<Observation>, Error> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| Error::SeriesParse(e.to_string()))
}

fn cmd_analyze(
    args: &AnalyzeArgs,
    global: &GlobalOpts,
    config: &EngineConfig,
) -> Result<ExitCode, Error> {
    let series = read_series(&args.input)?;

    let mut overlay = OverlayState::None;
    if args.trend {
        overlay.activate_trend();
    } else if let Some(period) = args.seasonal {
        if !spc_core::seasonality::allowed_periods(&series).contains(&period) {
            tracing::warn!(
                %period,
                "series sampling is too coarse for this period; factors will be unreliable"
            );
        }
        overlay.activate_seasonal(period, args.grouped);
    } else if args.auto_lock {
        if let (_, Some(state)) = auto_lock_overlay(&series, config) {
            overlay.activate_lock(state);
        }
    }

    let options = AnalysisOptions {
        mode: args.mode,
        dividers: args.dividers as usize,
    };
    let report = analyze(&series, &overlay, &options, config);
    let clean = report.violations.is_empty();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Summary => {
            println!(
                "points={} avg_x={} unpl={} lnpl={} violations={}",
                report.points.len(),
                report.limits.avg_x,
                report.limits.unpl,
                report.limits.lnpl,
                if clean { "none" } else { "detected" }
            );
        }
    }

    Ok(if clean {
        ExitCode::Clean
    } else {
        ExitCode::Violations
    })
}

fn cmd_check(args: &CheckArgs, global: &GlobalOpts) -> Result<ExitCode, Error> {
    let path = args
        .file
        .as_deref()
        .or(global.config.as_deref())
        .ok_or_else(|| Error::Config("no configuration file given".into()))?;
    let config = EngineConfig::load(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(ExitCode::Clean)
}
