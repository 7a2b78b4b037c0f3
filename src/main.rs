use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pacetrack::audio::{AudioDispatcher, LogAudio};
use pacetrack::clock::ManualClock;
use pacetrack::config::TrackerConfig;
use pacetrack::error::{ErrorSeverity, TrackerError};
use pacetrack::export::{self, ExportFormat};
use pacetrack::import::ImportManager;
use pacetrack::logging::{init_logging, LogLevel};
use pacetrack::models::{ActivitySummary, WorkoutMode};
use pacetrack::session::WorkoutSession;
use pacetrack::telemetry::format_duration;

/// pacetrack - live run tracking engine
///
/// Replays recorded GPS tracks through the same filter, telemetry and split
/// pipeline a live session uses, and manages tracker configuration.
#[derive(Parser)]
#[command(name = "pacetrack")]
#[command(version)]
#[command(about = "Live run tracking and telemetry engine", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded GPX track as a live session
    Replay {
        /// Input GPX file
        file: PathBuf,

        /// Workout mode (walk, jog, run, sprint, long_run, recovery)
        #[arg(short, long, default_value = "run")]
        mode: WorkoutMode,

        /// Body weight in kg for the calorie estimate
        #[arg(short, long)]
        weight: Option<f64>,

        /// Pause once this many kilometers are covered
        #[arg(long, requires = "pause_secs")]
        pause_at_km: Option<f64>,

        /// Length of the pause in seconds
        #[arg(long, requires = "pause_at_km")]
        pause_secs: Option<u64>,

        /// Notes stored with the summary
        #[arg(short, long)]
        notes: Option<String>,

        /// Write the summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the accepted route as GPX
        #[arg(long)]
        gpx_out: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the configuration file location
    Path,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        report_error(&e);
        std::process::exit(1);
    }
}

/// Print a failed command the way a runner should read it
fn report_error(err: &anyhow::Error) {
    let Some(tracker_err) = err.downcast_ref::<TrackerError>() else {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        return;
    };

    match tracker_err.severity() {
        ErrorSeverity::Error => tracing::error!(error = %tracker_err, "Command failed"),
        ErrorSeverity::Warning => tracing::warn!(
            error = %tracker_err,
            recoverable = tracker_err.is_recoverable(),
            "Command failed"
        ),
        ErrorSeverity::Info => tracing::info!(error = %tracker_err, "Command failed"),
    }
    eprintln!("{} {}", "Error:".red().bold(), tracker_err.user_message());
}

fn run(cli: Cli) -> Result<()> {

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(TrackerConfig::default_config_path);
    let mut config = if config_path.exists() {
        TrackerConfig::load_from_file(&config_path)?
    } else {
        TrackerConfig::default()
    };

    if cli.verbose > 0 {
        config.logging.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Replay {
            file,
            mode,
            weight,
            pause_at_km,
            pause_secs,
            notes,
            output,
            gpx_out,
        } => {
            if let Some(kg) = weight {
                config.telemetry.body_weight_kg = kg;
                config.validate()?;
            }
            let pause = pause_at_km.zip(pause_secs);

            println!("{}", "Replaying track...".green().bold());
            println!("  File: {}", file.display());
            println!("  Mode: {}", mode);

            let summary = replay(&config, &file, mode, pause, notes)?;
            print_summary(&summary);

            if let Some(path) = output {
                export::export_summary(&summary, ExportFormat::Json, &path)?;
                println!("{} {}", "✓ Summary written to".green(), path.display());
            }
            if let Some(path) = gpx_out {
                export::export_summary(&summary, ExportFormat::Gpx, &path)?;
                println!("{} {}", "✓ Route written to".green(), path.display());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let rendered =
                    toml::to_string_pretty(&config).context("Failed to render configuration")?;
                println!("{}", format!("# {}", config_path.display()).dimmed());
                println!("{}", rendered);
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        config_path.display()
                    );
                }
                TrackerConfig::default().save_to_file(&config_path)?;
                println!("{} {}", "✓ Configuration written to".green(), config_path.display());
            }
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}

/// Drive a session from recorded fixes. The manual clock follows the fix
/// timestamps, so elapsed time and splits match the original run.
fn replay(
    config: &TrackerConfig,
    file: &Path,
    mode: WorkoutMode,
    pause: Option<(f64, u64)>,
    notes: Option<String>,
) -> Result<ActivitySummary> {
    let fixes = ImportManager::new().import_file(file)?;
    let first_ms = fixes.first().map(|f| f.timestamp_ms).unwrap_or_default();

    let clock = ManualClock::new(first_ms);
    let mut session = WorkoutSession::new(mode, config, Arc::new(clock.clone()));
    let mut audio = AudioDispatcher::new(config.audio.clone(), Box::new(LogAudio));

    session.confirm_start()?;
    session.activate()?;

    let mut pending_pause = pause;
    let mut shift_ms: i64 = 0;

    for fix in &fixes {
        let mut fix = fix.clone();
        fix.timestamp_ms += shift_ms;

        // fill whole seconds between fixes so the tick path runs as it would live
        let tick_ms = config.telemetry.tick_interval_ms.max(1) as i64;
        while clock.now_ms() + tick_ms < fix.timestamp_ms {
            clock.advance(tick_ms);
            session.tick();
        }
        clock.set(fix.timestamp_ms.max(clock.now_ms()));
        session.ingest_fix(&fix);

        if let Some((km, secs)) = pending_pause {
            if session.distance_m() >= km * 1000.0 {
                session.pause()?;
                let pause_ms = (secs * 1000) as i64;
                clock.advance(pause_ms);
                shift_ms += pause_ms;
                session.resume()?;
                // the runner stood still; re-anchor the route where they stopped
                let mut anchor = fix.clone();
                anchor.timestamp_ms = clock.now_ms();
                session.ingest_fix(&anchor);
                pending_pause = None;
            }
        }

        for event in session.take_events() {
            audio.dispatch(&event);
        }
    }

    let summary = session.finish(notes)?;
    for event in session.take_events() {
        audio.dispatch(&event);
    }
    Ok(summary)
}

fn print_summary(summary: &ActivitySummary) {
    println!();
    println!("{}", "Session summary".cyan().bold());
    println!("  Distance:  {} km", summary.distance_km);
    println!("  Duration:  {} min", summary.duration_min);
    println!(
        "  Avg pace:  {}",
        summary.avg_pace.as_deref().unwrap_or("--:--")
    );
    println!("  Elevation: {} m", summary.elevation_gain_m);
    println!("  Calories:  {} kcal", summary.calories_kcal);
    println!("  Points:    {}", summary.route.len());

    if !summary.splits.is_empty() {
        println!();
        println!("{}", "Splits".cyan().bold());
        for split in &summary.splits {
            println!(
                "  km {:>3}  {}  ({}/km)",
                split.km_index,
                format_duration(split.split_duration_seconds),
                split.pace_label.yellow()
            );
        }
    }
}
