use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossbeam_channel::unbounded;
use rp_models::ModelRegistry;
use rp_optimizer::BandSubpopOptimizer;
use rp_runner::{EventLog, JsonFileSink, Runner};
use rp_types::{HyperparameterGrid, IntRange, RunConfig, DEFAULT_SEED};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status for configuration errors.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "rp-run",
    version,
    about = "Run a replicated band/subpopulation study until N trials succeed or N fail"
)]
struct Cli {
    /// Data-generating model name
    model: String,
    /// Series per generated dataset
    #[arg(allow_hyphen_values = true)]
    replicates: i64,
    /// Observations per series
    #[arg(allow_hyphen_values = true)]
    length: i64,
    /// Successful trials to collect; also the failure budget
    #[arg(allow_hyphen_values = true)]
    successes: i64,
    /// Worker threads inside each optimizer call
    #[arg(allow_hyphen_values = true)]
    parallelism: i64,
    /// Directory receiving one artifact per successful trial
    output_dir: PathBuf,

    /// Base seed; attempt n uses seed + n - 1
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Extra artifact-name component for runs sharing a directory
    #[arg(long)]
    salt: Option<String>,
    /// Candidate band counts, MIN:MAX inclusive
    #[arg(long, default_value = "2:6")]
    bands: IntRange,
    /// Candidate subpopulation counts, MIN:MAX inclusive
    #[arg(long, default_value = "2:6")]
    subpops: IntRange,
    /// Append JSON progress events to this file
    #[arg(long)]
    events: Option<PathBuf>,
    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn run_config(&self) -> Result<RunConfig, rp_types::ConfigError> {
        let mut config = RunConfig::try_new(
            self.model.clone(),
            self.replicates,
            self.length,
            self.successes,
            self.parallelism,
            self.output_dir.clone(),
        )?
        .with_seed(self.seed)
        .with_grid(HyperparameterGrid::new(self.bands, self.subpops));
        if let Some(salt) = &self.salt {
            config = config.with_naming_salt(salt.clone());
        }
        config.validate()?;
        config.prepare_output_dir()?;
        Ok(config)
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let config = match cli.run_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(EXIT_CONFIG);
        }
    };

    let registry = ModelRegistry::with_builtin_models();
    if !registry.contains(&config.model_name) {
        warn!(
            "Model '{}' is not registered (available: {}); every trial will fail",
            config.model_name,
            registry.names().join(", ")
        );
    }
    let optimizer = BandSubpopOptimizer::new();
    let sink = JsonFileSink::new();

    let mut runner = Runner::new(&config, &registry, &optimizer, &sink);
    let mut event_log = None;
    if let Some(path) = &cli.events {
        let (tx, rx) = unbounded();
        match EventLog::spawn(path, rx) {
            Ok(log) => event_log = Some(log),
            Err(e) => {
                error!("Cannot open event log {}: {}", path.display(), e);
                process::exit(EXIT_CONFIG);
            }
        }
        runner = runner.with_events(tx);
    }

    let summary = match runner.run() {
        Ok(summary) => summary,
        Err(e) if !e.is_recoverable() => {
            error!("{}", e);
            process::exit(EXIT_CONFIG);
        }
        Err(e) => return Err(e.into()),
    };
    // Closes the event channel so the log writer can finish.
    drop(runner);

    println!(
        "{}: {} successes, {} failures, {} attempts, {:.1}s total",
        summary.prefix,
        summary.successes,
        summary.failures,
        summary.attempts,
        summary.elapsed_seconds
    );

    if let Some(log) = event_log {
        close_event_log(log);
    }
    Ok(())
}

/// Wait for the event writer. The study's outcome is already on disk, so a
/// broken log only warns.
fn close_event_log(log: EventLog) -> Option<usize> {
    match log.join() {
        Ok(written) => {
            info!("Wrote {} progress events", written);
            Some(written)
        }
        Err(e) => {
            warn!("Event log incomplete: {}", e);
            None
        }
    }
}
