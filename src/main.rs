//! canvas-remap - Canvas-mode trace replay
//!
//! Entry point for the replay binary.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use canvas_remap::config::{Config, LoggingConfig};
use canvas_remap::replay::{read_trace, ReplaySession};

/// Command-line arguments for canvas-remap
#[derive(Parser, Debug)]
#[command(name = "canvas-remap")]
#[command(version, about = "Replay tablet traces through the canvas transform", long_about = None)]
pub struct Args {
    /// Trace file in JSON-lines format ("-" reads stdin)
    #[arg(default_value = "-")]
    pub trace: String,

    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, env = "CANVAS_REMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write transformed reports here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the reset time in milliseconds (negative: absolute mode)
    #[arg(long, allow_hyphen_values = true)]
    pub reset_time_ms: Option<i32>,

    /// Override the speed multiplier
    #[arg(long)]
    pub speed: Option<f32>,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    pub print_default_config: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact), overrides the config file
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        let toml = toml::to_string_pretty(&Config::default_config())
            .context("Failed to serialize default config")?;
        print!("{}", toml);
        return Ok(());
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", canvas_remap::utils::format_user_error(&e));
            return Err(e);
        }
    };

    // Held until exit so buffered log lines are flushed
    let _log_guards = init_logging(&args, &config.logging)?;

    info!("════════════════════════════════════════════════════════");
    info!("  canvas-remap v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {}", env!("BUILD_DATE"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    if args.check {
        info!("Configuration is valid");
        return Ok(());
    }

    if let Err(e) = replay(&args, &config) {
        eprintln!("{}", canvas_remap::utils::format_user_error(&e));
        return Err(e);
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default_config(),
    };

    // Override config with CLI args
    let config = config.with_overrides(args.reset_time_ms, args.speed);
    config.validate().context("Invalid config after CLI overrides")?;
    Ok(config)
}

fn replay(args: &Args, config: &Config) -> Result<()> {
    let reader: Box<dyn BufRead> = if args.trace == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&args.trace)
            .with_context(|| format!("Failed to open trace file: {}", args.trace))?;
        Box::new(BufReader::new(file))
    };
    let events = read_trace(reader)?;
    info!("Replaying {} trace events", events.len());

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let session = ReplaySession::new(config)?;
    let summary = session.run(events, writer)?;

    info!(
        "Replayed {} reports ({} faults, {} binding events)",
        summary.records, summary.faults, summary.binding_events
    );
    debug!(
        "Summary: {}",
        serde_json::to_string(&summary).unwrap_or_default()
    );
    Ok(())
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

fn fmt_layer<S, W>(format: &str, writer: W, ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);

    match format {
        "json" => layer.json().boxed(),
        "compact" => layer.compact().boxed(),
        _ => layer.pretty().boxed(),
    }
}

fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<Vec<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let format = args.log_format.as_deref().unwrap_or(&logging.format);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("canvas_remap={level},warn", level = log_level))
    });

    // stdout carries replay output, logs always go to stderr
    let mut guards = Vec::new();
    let mut file_layers = Vec::new();

    if let Some(log_file_path) = &args.log_file {
        let file = File::create(log_file_path)
            .with_context(|| format!("Failed to create log file: {}", log_file_path.display()))?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        guards.push(guard);
        file_layers.push(fmt_layer(format, writer, false));
    }

    if let Some(log_dir) = &logging.log_dir {
        let (writer, guard) = tracing_appender::non_blocking(rolling_appender(log_dir));
        guards.push(guard);
        file_layers.push(fmt_layer(format, writer, false));
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(format, io::stderr, true))
        .with(file_layers)
        .init();

    if let Some(log_file_path) = &args.log_file {
        info!("Logging to file: {}", log_file_path.display());
    }
    if let Some(log_dir) = &logging.log_dir {
        info!("Logging to directory: {}", log_dir.display());
    }

    Ok(guards)
}

fn rolling_appender(log_dir: &Path) -> tracing_appender::rolling::RollingFileAppender {
    tracing_appender::rolling::daily(log_dir, "canvas-remap.log")
}
