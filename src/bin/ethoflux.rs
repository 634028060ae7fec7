//! Ethoflux CLI - Command-line interface for Ethoflux
//!
//! Commands:
//! - extract: Segment frame files into events and sequences (Stage 1)
//! - aggregate: Build cohort tables from extracted events (Stage 2)
//! - run: Both stages in order
//! - validate: Check frame files without writing anything

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ethoflux::pipeline::{check_frames, run_aggregation, EthoProcessor, RunManifest};
use ethoflux::table::{self, TableFormat};
use ethoflux::types::FrameRecord;
use ethoflux::{ComputeError, PipelineConfig, SessionGroupMap, ETHOFLUX_VERSION};

/// Ethoflux - Ethogram interaction sequences from per-frame tracking
#[derive(Parser)]
#[command(name = "ethoflux")]
#[command(version = ETHOFLUX_VERSION)]
#[command(
    about = "Segment animal tracking into approach/collision/retreat sequences",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract events and sequences per animal (Stage 1)
    Extract {
        #[command(flatten)]
        input: InputArgs,

        /// Output root directory
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Table format
        #[arg(long, default_value = "ndjson")]
        format: OutputFormat,
    },

    /// Aggregate extracted events into cohort tables (Stage 2)
    Aggregate {
        /// Output root directory used by `extract`
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Table format
        #[arg(long, default_value = "ndjson")]
        format: OutputFormat,
    },

    /// Run extraction then aggregation
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Output root directory
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Table format
        #[arg(long, default_value = "ndjson")]
        format: OutputFormat,
    },

    /// Validate frame files
    Validate {
        /// Directory of per-animal frame files
        #[arg(short, long)]
        frames: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Directory of per-animal frame files (<animal>.ndjson or <animal>.json)
    #[arg(short, long)]
    frames: PathBuf,

    /// Session-group JSON mapping group codes to video paths
    #[arg(short, long)]
    groups: PathBuf,
}

#[derive(Args)]
struct ConfigArgs {
    /// Pipeline config JSON; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames after an approach in which a collision may start
    #[arg(long)]
    collision_window: Option<u64>,

    /// Frames after an approach or collision in which a retreat may start
    #[arg(long)]
    retreat_window: Option<u64>,

    /// Minimum event duration in frames
    #[arg(long)]
    min_event_frames: Option<u64>,

    /// Recording frame rate
    #[arg(long)]
    fps: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
}

impl From<OutputFormat> for TableFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Ndjson => TableFormat::Ndjson,
            OutputFormat::Json => TableFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), EthoCliError> {
    match cli.command {
        Commands::Extract {
            input,
            out,
            config,
            format,
        } => {
            let config = load_config(&config)?;
            cmd_extract(&input, &out, config, format.into()).map(|_| ())
        }

        Commands::Aggregate {
            out,
            config,
            format,
        } => {
            let config = load_config(&config)?;
            cmd_aggregate(&out, &config, format.into())
        }

        Commands::Run {
            input,
            out,
            config,
            format,
        } => {
            let config = load_config(&config)?;
            let format = format.into();
            cmd_extract(&input, &out, config.clone(), format)?;
            cmd_aggregate(&out, &config, format)
        }

        Commands::Validate { frames, json } => cmd_validate(&frames, json),
    }
}

/// Config file (or defaults) with command-line overrides applied
fn load_config(args: &ConfigArgs) -> Result<PipelineConfig, EthoCliError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };

    if let Some(window) = args.collision_window {
        config.collision_window = window;
    }
    if let Some(window) = args.retreat_window {
        config.retreat_window = window;
    }
    if let Some(min) = args.min_event_frames {
        config.min_event_frames = min;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_extract(
    input: &InputArgs,
    out: &Path,
    config: PipelineConfig,
    format: TableFormat,
) -> Result<RunManifest, EthoCliError> {
    let groups = SessionGroupMap::from_file(&input.groups)?;
    if groups.is_empty() {
        return Err(EthoCliError::NoAnimals);
    }

    let processor = EthoProcessor::new(config, groups)?.with_format(format);
    let manifest = processor.run_extraction(&input.frames, out)?;

    if manifest.animals.is_empty() && manifest.failures.is_empty() {
        return Err(EthoCliError::NoAnimals);
    }
    if manifest.all_failed() {
        return Err(EthoCliError::AllAnimalsFailed(manifest.failures.len()));
    }

    Ok(manifest)
}

fn cmd_aggregate(
    out: &Path,
    config: &PipelineConfig,
    format: TableFormat,
) -> Result<(), EthoCliError> {
    run_aggregation(out, config.fps, format)?;
    Ok(())
}

fn cmd_validate(frames_dir: &Path, json: bool) -> Result<(), EthoCliError> {
    let files = table::list_tables(frames_dir)?;
    if files.is_empty() {
        return Err(EthoCliError::NoAnimals);
    }

    let mut report = ValidationReport {
        total_animals: files.len(),
        valid_animals: 0,
        invalid_animals: 0,
        errors: Vec::new(),
    };

    for path in &files {
        let animal_name = table::animal_name(path).unwrap_or("unknown").to_string();
        let result = table::read_table::<FrameRecord>(path).and_then(check_frames);

        match result {
            Ok(summary) => {
                log::debug!("{}: {:?}", animal_name, summary);
                report.valid_animals += 1;
            }
            Err(e) => {
                report.invalid_animals += 1;
                report.errors.push(ValidationErrorDetail {
                    animal_name,
                    error: e.to_string(),
                });
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total animals:   {}", report.total_animals);
        println!("Valid animals:   {}", report.valid_animals);
        println!("Invalid animals: {}", report.invalid_animals);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {}: {}", err.animal_name, err.error);
            }
        }
    }

    if report.invalid_animals > 0 {
        Err(EthoCliError::ValidationFailed(report.invalid_animals))
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum EthoCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoAnimals,
    AllAnimalsFailed(usize),
    ValidationFailed(usize),
}

impl From<io::Error> for EthoCliError {
    fn from(e: io::Error) -> Self {
        EthoCliError::Io(e)
    }
}

impl From<ComputeError> for EthoCliError {
    fn from(e: ComputeError) -> Self {
        EthoCliError::Compute(e)
    }
}

impl From<serde_json::Error> for EthoCliError {
    fn from(e: serde_json::Error) -> Self {
        EthoCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EthoCliError> for CliError {
    fn from(e: EthoCliError) -> Self {
        match e {
            EthoCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EthoCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Check --config and the window/fps flags")
                    }
                    ComputeError::MissingMetadata(_) => {
                        ("MISSING_METADATA", "Add the animal to the session-group file")
                    }
                    ComputeError::MalformedInput(_) => {
                        ("MALFORMED_INPUT", "Run 'ethoflux validate' for details")
                    }
                    ComputeError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    ComputeError::ParseError(_) | ComputeError::JsonError(_) => {
                        ("PARSE_ERROR", "Check input format")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            EthoCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            EthoCliError::NoAnimals => CliError {
                code: "NO_ANIMALS".to_string(),
                message: "No animals found in input".to_string(),
                hint: Some(
                    "Ensure the frames directory and session-group file are not empty".to_string(),
                ),
            },
            EthoCliError::AllAnimalsFailed(count) => CliError {
                code: "ALL_ANIMALS_FAILED".to_string(),
                message: format!("All {} animals failed extraction", count),
                hint: Some("See failures in events/manifest.json".to_string()),
            },
            EthoCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} animals failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_animals: usize,
    valid_animals: usize,
    invalid_animals: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    animal_name: String,
    error: String,
}
