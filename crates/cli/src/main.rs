mod batch;
mod copy;

use clap::{error::ErrorKind, Args, Parser, Subcommand, ValueEnum};
use kinegate_metrics::{
    classify, extract_metrics, load_clip, AnnotationSource, ClipSource, GlobalParamsSource,
    ThresholdConfig, DEFAULT_MAX_ACCELERATION, DEFAULT_MAX_ANGULAR_ACCELERATION,
    DEFAULT_MAX_ANGULAR_VELOCITY, DEFAULT_MAX_VELOCITY,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::env;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kinegate", version, about = "Motion reconstruction anomaly screening")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short = 'j', global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Screen every clip in a directory and write metrics/anomalies CSVs.
    Scan {
        dir: PathBuf,
        #[arg(long, value_enum, default_value = "global")]
        format: SourceFormat,
        #[arg(long, default_value = batch::DEFAULT_OUT_DIR)]
        out: PathBuf,
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        max_clips: Option<usize>,
        /// Clips with fewer frames are skipped before metric extraction.
        #[arg(long, default_value_t = batch::DEFAULT_MIN_FRAMES)]
        min_frames: usize,
        #[arg(long)]
        strict: bool,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Compute metrics and flags for a single clip file.
    Inspect {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "global")]
        format: SourceFormat,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Copy the media files of flagged clips into a separate folder.
    CopyFlagged {
        csv: PathBuf,
        src_dir: PathBuf,
        dst_dir: PathBuf,
        #[arg(long, default_value = "mp4")]
        extension: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceFormat {
    /// GVHMR-style per-clip JSON with a global SMPL parameter tree.
    Global,
    /// Motion-X-style per-clip JSON with a per-frame annotation list.
    Annotations,
}

impl SourceFormat {
    fn source(self) -> &'static (dyn ClipSource + Send + Sync) {
        match self {
            Self::Global => &GlobalParamsSource,
            Self::Annotations => &AnnotationSource,
        }
    }
}

#[derive(Args, Clone, Copy, Debug)]
struct ThresholdArgs {
    #[arg(long, default_value_t = DEFAULT_MAX_VELOCITY)]
    max_velocity: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_ACCELERATION)]
    max_acceleration: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_ANGULAR_VELOCITY)]
    max_angular_velocity: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_ANGULAR_ACCELERATION)]
    max_angular_acceleration: f64,
}

impl ThresholdArgs {
    fn to_config(self) -> ThresholdConfig {
        ThresholdConfig {
            max_velocity: self.max_velocity,
            max_acceleration: self.max_acceleration,
            max_angular_velocity: self.max_angular_velocity,
            max_angular_acceleration: self.max_angular_acceleration,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum AppErrorKind {
    Usage,
    Dependency,
    Internal,
}

#[derive(Clone, Debug)]
struct AppError {
    kind: AppErrorKind,
    code: &'static str,
    message: String,
    data: Option<Box<Value>>,
}

impl AppError {
    fn usage(message: String) -> Self {
        Self {
            kind: AppErrorKind::Usage,
            code: "CLI_USAGE",
            message,
            data: None,
        }
    }

    fn dependency(message: String) -> Self {
        Self {
            kind: AppErrorKind::Dependency,
            code: "DEPENDENCY_ERROR",
            message,
            data: None,
        }
    }

    fn internal(message: String) -> Self {
        Self {
            kind: AppErrorKind::Internal,
            code: "INTERNAL_ERROR",
            message,
            data: None,
        }
    }

    fn load_failure(message: String) -> Self {
        Self {
            kind: AppErrorKind::Dependency,
            code: "CLIP_LOAD",
            message,
            data: None,
        }
    }

    fn extraction_failure(message: String) -> Self {
        Self {
            kind: AppErrorKind::Dependency,
            code: "METRIC_EXTRACTION",
            message,
            data: None,
        }
    }

    fn strict_failure(message: String) -> Self {
        Self {
            kind: AppErrorKind::Dependency,
            code: "SCAN_STRICT_FAILURE",
            message,
            data: None,
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    fn exit_code(&self) -> i32 {
        match self.kind {
            AppErrorKind::Usage => 1,
            AppErrorKind::Dependency | AppErrorKind::Internal => 2,
        }
    }
}

#[derive(Serialize)]
struct JsonEnvelope {
    status: String,
    error: Option<ErrorEnvelope>,
    data: Option<Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    code: String,
    message: String,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let wants_json = args.iter().any(|arg| arg == "--json" || arg == "-j");

    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            let json = cli.json || wants_json;
            match run(cli, json) {
                Ok(envelope) => {
                    if json {
                        print_json(&envelope);
                    }
                    std::process::exit(0);
                }
                Err(err) => {
                    let exit_code = err.exit_code();
                    if json {
                        print_json(&error_envelope(&err));
                    } else {
                        eprintln!("{}", err.message);
                    }
                    std::process::exit(exit_code);
                }
            }
        }
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                std::process::exit(0);
            }
            _ => {
                if wants_json {
                    let usage = AppError::usage(err.to_string());
                    print_json(&error_envelope(&usage));
                } else {
                    let _ = err.print();
                }
                std::process::exit(1);
            }
        },
    }
}

fn run(cli: Cli, json: bool) -> Result<JsonEnvelope, AppError> {
    match cli.command {
        Commands::Scan {
            dir,
            format,
            out,
            threads,
            max_clips,
            min_frames,
            strict,
            thresholds,
        } => batch::run(batch::ScanCommand {
            dir,
            source: format.source(),
            out,
            threads,
            max_clips,
            min_frames,
            strict,
            json_output: json,
            thresholds: thresholds.to_config(),
        }),
        Commands::Inspect {
            file,
            format,
            thresholds,
        } => inspect(file, format, thresholds.to_config(), json),
        Commands::CopyFlagged {
            csv,
            src_dir,
            dst_dir,
            extension,
        } => copy::run(copy::CopyCommand {
            csv,
            src_dir,
            dst_dir,
            extension,
            json_output: json,
        }),
    }
}

fn inspect(
    file: PathBuf,
    format: SourceFormat,
    thresholds: ThresholdConfig,
    json: bool,
) -> Result<JsonEnvelope, AppError> {
    let video_id = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("clip")
        .to_string();

    let sequences = load_clip(&file, format.source()).map_err(|err| {
        AppError::load_failure(format!("failed to load {}: {}", file.display(), err))
    })?;
    let frames = sequences.frames();
    let metrics = extract_metrics(&sequences.translations, &sequences.rotations)
        .map_err(|err| AppError::extraction_failure(format!("{}: {}", video_id, err)))?;
    let flags = classify(&metrics, &thresholds);
    let anomalous = flags.any();

    if !json {
        println!("clip: {}", video_id);
        println!("frames: {}", frames);
        println!(
            "root_mean_velocity={} root_mean_acceleration={}",
            metrics.root_mean_velocity, metrics.root_mean_acceleration
        );
        println!(
            "body_mean_angular_velocity={} body_mean_angular_acceleration={}",
            metrics.body_mean_angular_velocity, metrics.body_mean_angular_acceleration
        );
        println!("verdict: {}", if anomalous { "ANOMALOUS" } else { "OK" });
    }

    Ok(JsonEnvelope {
        status: if anomalous { "ANOMALOUS" } else { "OK" }.to_string(),
        error: None,
        data: Some(json!({
            "video_id": video_id,
            "frames": frames,
            "metrics": metrics,
            "flags": flags,
            "anomalous": anomalous,
        })),
    })
}

fn error_envelope(err: &AppError) -> JsonEnvelope {
    JsonEnvelope {
        status: "ERROR".to_string(),
        error: Some(ErrorEnvelope {
            code: err.code.to_string(),
            message: err.message.clone(),
        }),
        data: err.data.as_deref().cloned(),
    }
}

fn print_json(envelope: &JsonEnvelope) {
    let json = serde_json::to_string(envelope).expect("failed to serialize json");
    println!("{json}");
}
