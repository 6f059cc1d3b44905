//! Track CLI - Command-line interface for Synheart Track
//!
//! Commands:
//! - summarize: Build a track from points and print the workout summary
//! - range: Aggregate statistics over an index range
//! - intervals: Best-effort intervals for target distances
//! - rank: Rank stored interval records
//! - climb: Select the biggest climb across workouts
//! - doctor: Diagnose configuration and inputs

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use synheart_track::pipeline::{parse_points_json, parse_points_ndjson, PointPayload};
use synheart_track::types::{IntervalTarget, WorkoutRef};
use synheart_track::{
    default_targets, ClimbSelector, EngineConfig, GeoidGrid, RankComputer, StoredInterval,
    TrackError, TrackProcessor, WorkoutClimbs, PRODUCER_NAME, TRACK_VERSION,
};

/// Track - Analysis engine for recorded workout tracks
#[derive(Parser)]
#[command(name = "track")]
#[command(author = "Synheart AI Inc")]
#[command(version = TRACK_VERSION)]
#[command(about = "Derive statistics and records from workout tracks", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Geoid undulation grid (JSON) replacing the built-in coarse grid
    #[arg(long)]
    geoid: Option<PathBuf>,
}

#[derive(Args)]
struct PointArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "json")]
    input_format: InputFormat,

    /// Creator/device tag, overrides the one in the payload
    #[arg(long)]
    creator: Option<String>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a track and print the workout summary
    Summarize {
        #[command(flatten)]
        points: PointArgs,

        /// Workout identifier recorded in interval records
        #[arg(long)]
        workout_id: Option<Uuid>,

        /// Interval targets as label=metres (defaults to the standard list)
        #[arg(long = "target", value_parser = parse_target)]
        targets: Vec<IntervalTarget>,
    },

    /// Aggregate statistics over an inclusive index range
    Range {
        #[command(flatten)]
        points: PointArgs,

        /// First sample index
        #[arg(long)]
        from: usize,

        /// Last sample index (inclusive)
        #[arg(long)]
        to: usize,
    },

    /// Best-effort intervals for target distances
    Intervals {
        #[command(flatten)]
        points: PointArgs,

        /// Workout identifier recorded in interval records
        #[arg(long)]
        workout_id: Option<Uuid>,

        /// Interval targets as label=metres (defaults to the standard list)
        #[arg(long = "target", value_parser = parse_target)]
        targets: Vec<IntervalTarget>,
    },

    /// Rank stored interval records (JSON array)
    Rank {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Select the biggest climb across workouts (JSON array)
    Climb {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Diagnose configuration and inputs
    Doctor {
        #[command(flatten)]
        engine: EngineArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of points, or {"creator": .., "points": [..]}
    Json,
    /// Newline-delimited JSON (one point per line)
    Ndjson,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TrackCliError> {
    let pretty = cli.pretty;
    match cli.command {
        Commands::Summarize {
            points,
            workout_id,
            targets,
        } => {
            let processor = load_processor(&points.engine)?;
            let payload = load_points(&points)?;
            let targets = targets_or_default(targets);
            let summary = processor.summarize(
                payload,
                workout_id.unwrap_or_else(Uuid::new_v4),
                &targets,
            )?;
            print_json(&summary, pretty)
        }

        Commands::Range { points, from, to } => {
            let processor = load_processor(&points.engine)?;
            let payload = load_points(&points)?;
            let track = processor.build_track(payload.points, payload.creator.as_deref());
            let stats = processor
                .range(&track, from, to)
                .ok_or(TrackCliError::RangeNotFound {
                    from,
                    to,
                    len: track.len(),
                })?;
            print_json(&stats, pretty)
        }

        Commands::Intervals {
            points,
            workout_id,
            targets,
        } => {
            let processor = load_processor(&points.engine)?;
            let payload = load_points(&points)?;
            let track = processor.build_track(payload.points, payload.creator.as_deref());
            let start = track.start_time().ok_or(TrackError::EmptyTrack)?;
            let workout = WorkoutRef {
                id: workout_id.unwrap_or_else(Uuid::new_v4),
                date: start,
            };
            let records = processor.intervals(&track, &targets_or_default(targets), &workout);
            print_json(&records, pretty)
        }

        Commands::Rank { input } => {
            let records: Vec<StoredInterval> = serde_json::from_str(&read_input(&input)?)?;
            print_json(&RankComputer::rank(&records), pretty)
        }

        Commands::Climb { input } => {
            let workouts: Vec<WorkoutClimbs> = serde_json::from_str(&read_input(&input)?)?;
            print_json(&ClimbSelector::select(&workouts), pretty)
        }

        Commands::Doctor { engine, json } => cmd_doctor(&engine, json),
    }
}

fn load_processor(args: &EngineArgs) -> Result<TrackProcessor, TrackCliError> {
    let config = match &args.config {
        Some(path) => read_and_parse(path, EngineConfig::from_json)?,
        None => EngineConfig::default(),
    };
    let processor = TrackProcessor::with_config(config);

    Ok(match &args.geoid {
        Some(path) => processor.with_height_model(read_and_parse(path, GeoidGrid::from_json)?),
        None => processor,
    })
}

fn load_points(args: &PointArgs) -> Result<PointPayload, TrackCliError> {
    let data = read_input(&args.input)?;
    let mut payload = match args.input_format {
        InputFormat::Json => parse_points_json(&data)?,
        InputFormat::Ndjson => parse_points_ndjson(&data)?,
    };
    if payload.points.is_empty() {
        return Err(TrackCliError::NoPoints);
    }
    if let Some(creator) = &args.creator {
        payload.creator = Some(creator.clone());
    }
    Ok(payload)
}

fn read_input(input: &Path) -> Result<String, TrackCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn targets_or_default(targets: Vec<IntervalTarget>) -> Vec<IntervalTarget> {
    if targets.is_empty() {
        default_targets()
    } else {
        targets
    }
}

fn parse_target(s: &str) -> Result<IntervalTarget, String> {
    let (label, metres) = s
        .split_once('=')
        .ok_or_else(|| format!("expected label=metres, got '{}'", s))?;
    let distance: f64 = metres
        .trim()
        .parse()
        .map_err(|_| format!("invalid distance '{}'", metres))?;
    if !distance.is_finite() || distance <= 0.0 {
        return Err(format!("distance must be positive, got {}", distance));
    }
    Ok(IntervalTarget::new(label.trim(), distance))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), TrackCliError> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", output);
    Ok(())
}

fn cmd_doctor(engine: &EngineArgs, json: bool) -> Result<(), TrackCliError> {
    let mut checks = Vec::new();

    checks.push(match &engine.config {
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using default configuration".to_string(),
        },
        Some(path) => match read_and_parse(path, EngineConfig::from_json) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Moving threshold {} km/h, {} trusted creators",
                    config.moving_speed_threshold_kmh,
                    config.elevation_passthrough_creators.len()
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        },
    });

    checks.push(match &engine.geoid {
        None => DoctorCheck {
            name: "geoid".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Built-in coarse EGM96 grid, step {}°",
                GeoidGrid::egm96_coarse().step()
            ),
        },
        Some(path) => match read_and_parse(path, GeoidGrid::from_json) {
            Ok(grid) => DoctorCheck {
                name: "geoid".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Grid step {}°, latitude {}..{}",
                    grid.step(),
                    grid.lat_min(),
                    grid.lat_max()
                ),
            },
            Err(e) => DoctorCheck {
                name: "geoid".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        },
    });

    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Warning,
            message: "Interactive terminal, no piped input (pipe points with -i -)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "Piped input available".to_string(),
        }
    });

    let failed = checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TRACK_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} {}", report.producer, report.version);
        for check in &report.checks {
            let marker = match check.status {
                CheckStatus::Ok => "ok",
                CheckStatus::Warning => "warn",
                CheckStatus::Error => "FAIL",
            };
            println!("  [{:>4}] {}: {}", marker, check.name, check.message);
        }
    }

    if failed {
        Err(TrackCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn read_and_parse<T>(
    path: &Path,
    parse: fn(&str) -> Result<T, TrackError>,
) -> Result<T, TrackCliError> {
    let data = fs::read_to_string(path)?;
    Ok(parse(&data)?)
}

// Error types

#[derive(Debug)]
enum TrackCliError {
    Io(io::Error),
    Engine(TrackError),
    Json(serde_json::Error),
    NoPoints,
    RangeNotFound { from: usize, to: usize, len: usize },
    DoctorFailed,
}

impl std::fmt::Display for TrackCliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackCliError::Io(e) => write!(f, "{}", e),
            TrackCliError::Engine(e) => write!(f, "{}", e),
            TrackCliError::Json(e) => write!(f, "{}", e),
            TrackCliError::NoPoints => write!(f, "no points found in input"),
            TrackCliError::RangeNotFound { from, to, len } => {
                write!(f, "range {}..={} not available on {} samples", from, to, len)
            }
            TrackCliError::DoctorFailed => write!(f, "health checks failed"),
        }
    }
}

impl From<io::Error> for TrackCliError {
    fn from(e: io::Error) -> Self {
        TrackCliError::Io(e)
    }
}

impl From<TrackError> for TrackCliError {
    fn from(e: TrackError) -> Self {
        TrackCliError::Engine(e)
    }
}

impl From<serde_json::Error> for TrackCliError {
    fn from(e: serde_json::Error) -> Self {
        TrackCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TrackCliError> for CliError {
    fn from(e: TrackCliError) -> Self {
        match e {
            TrackCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TrackCliError::Engine(TrackError::EmptyTrack) => CliError {
                code: "EMPTY_TRACK".to_string(),
                message: TrackError::EmptyTrack.to_string(),
                hint: Some("All points had unusable coordinates".to_string()),
            },
            TrackCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the point payload, config and geoid files".to_string()),
            },
            TrackCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TrackCliError::NoPoints => CliError {
                code: "NO_POINTS".to_string(),
                message: "No points found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            TrackCliError::RangeNotFound { from, to, len } => CliError {
                code: "RANGE_NOT_FOUND".to_string(),
                message: format!("Range {}..={} not available on a track of {} samples", from, to, len),
                hint: Some("Use indices within the track; at least two samples are required".to_string()),
            },
            TrackCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
