//! markerfleet CLI: validate a mission or run it against the simulated arena.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use markerfleet::agents::LogNotifier;
use markerfleet::sim::SimBackend;
use markerfleet::tasks::{JsonLinesRecorder, NullRecorder, TaskRecorder};
use markerfleet::{Mission, MissionConfig};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "markerfleet")]
#[command(about = "Coordinate a marker-hunting fleet of scanners and carriers")]
#[command(version)]
struct Cli {
    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mission against the simulated arena.
    Run {
        /// Mission configuration (JSON).
        #[arg(long)]
        config: PathBuf,

        /// Path to write the mission report (JSON).
        #[arg(long)]
        report: Option<PathBuf>,

        /// Append every discovered task to this JSON-lines file.
        #[arg(long)]
        tasks_log: Option<PathBuf>,
    },
    /// Validate a mission configuration and print the fleet.
    Check {
        /// Mission configuration (JSON).
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    // With tracing enabled, RUST_LOG overrides --log-level.
    #[cfg(feature = "tracing")]
    markerfleet::core::init_tracing(false, cli.log_level);
    #[cfg(not(feature = "tracing"))]
    markerfleet::core::init_with_level(cli.log_level)?;

    match cli.command {
        Commands::Run {
            config,
            report,
            tasks_log,
        } => run_mission(&config, report.as_deref(), tasks_log.as_deref()),
        Commands::Check { config } => check_mission(&config),
    }
}

fn run_mission(config_path: &Path, report_path: Option<&Path>, tasks_log: Option<&Path>) -> CliResult<()> {
    let config = MissionConfig::load_json(config_path)?;
    let recorder: Arc<dyn TaskRecorder> = match tasks_log {
        Some(path) => Arc::new(JsonLinesRecorder::open(path)?),
        None => Arc::new(NullRecorder),
    };
    let backend = SimBackend::new(config.world.clone().unwrap_or_default(), config.localizer());
    let mission = Mission::new(config, recorder, Arc::new(LogNotifier))?;

    let report = mission.run(&backend);

    for outcome in report.scanners.iter().chain(&report.carriers) {
        let keys = if outcome.role.is_carrier() {
            &outcome.delivered
        } else {
            &outcome.published
        };
        println!(
            "{:<12} {:<15} {:<8} {}",
            outcome.id.as_str(),
            format!("{:?}", outcome.role),
            outcome.phase,
            keys.join(", ")
        );
    }
    println!(
        "published {} | delivered {} | remaining {} | failed agents {}",
        report.tasks_published,
        report.delivered().count(),
        report.tasks_remaining,
        report.failed().count()
    );

    if let Some(path) = report_path {
        report.write_json(path)?;
        log::info!("report written to {}", path.display());
    }
    Ok(())
}

fn check_mission(config_path: &Path) -> CliResult<()> {
    let config = MissionConfig::load_json(config_path)?;
    config.validate()?;

    for scanner in &config.scanners {
        println!(
            "scanner {} home {} waypoints {}",
            scanner.id,
            scanner.home,
            scanner.route.resolve().len()
        );
    }
    for carrier in &config.carriers {
        println!(
            "carrier {} home {} kind {:?} group {} tasks {}",
            carrier.id, carrier.home, carrier.kind, carrier.group, carrier.max_tasks
        );
    }
    println!(
        "ok: {} scanner(s), {} carrier(s), {} destination group(s)",
        config.scanners.len(),
        config.carriers.len(),
        config.destinations.groups.len()
    );
    Ok(())
}
