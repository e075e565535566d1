use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use img_convert::config::{DEFAULT_SOURCE_FORMATS, DEFAULT_THRESHOLD};
use img_convert::{parse_size_option, BatchRunner, RunConfig, SearchParams, TargetFormat};
use serde_json::json;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::thread_manager::resolve_worker_count;
use shared_utils::{print_summary_report, CancelFlag, RayonExecutor};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "img_convert")]
#[command(
    version,
    about = "Convert a tree of RAW, HEIC and standard images to size-bounded JPEG",
    long_about = None
)]
struct Cli {
    /// Root of the images to convert.
    #[arg(long, value_name = "DIR")]
    source_path: PathBuf,

    /// Root of the mirrored output tree. Must not be inside the source.
    #[arg(long, value_name = "DIR")]
    dest_path: PathBuf,

    /// Replace outputs that already exist.
    #[arg(long)]
    overwrite: bool,

    /// Files at or below this size are copied instead of converted.
    #[arg(long, default_value = DEFAULT_THRESHOLD)]
    threshold_size: String,

    /// Extensions to pick up. Repeat for several.
    #[arg(
        long = "source-format",
        value_name = "EXT",
        default_values_t = DEFAULT_SOURCE_FORMATS.iter().map(|s| s.to_string())
    )]
    source_formats: Vec<String>,

    #[arg(long, value_enum, default_value = "jpg")]
    target_format: TargetFormat,

    /// Longest output side in pixels, 0 keeps the original size.
    #[arg(long, default_value_t = 0)]
    target_dimension: u32,

    /// Best-effort ceiling for each output file, e.g. `200kB`. Empty means none.
    #[arg(long, default_value = "")]
    target_filesize: String,

    /// Parallel workers, 0 or less uses every core.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    max_tasks: i64,

    /// Stop the quality search once a fitting output is this close to the ceiling.
    #[arg(long, default_value = "3000")]
    size_tolerance: String,

    #[arg(long, default_value_t = 20)]
    min_quality: u8,

    #[arg(long, default_value_t = 95)]
    max_quality: u8,

    #[arg(long, default_value_t = 10)]
    max_iterations: u32,

    /// Log every file to stderr and hide the progress bar.
    #[arg(short, long)]
    verbose: bool,

    /// Directory for rolling log files (default: system temp dir).
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "human")]
    output: OutputFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

fn build_config(cli: &Cli) -> Result<RunConfig> {
    let threshold = parse_size_option("--threshold-size", &cli.threshold_size)?;
    let max_bytes = parse_size_option("--target-filesize", &cli.target_filesize)?;
    let tolerance = parse_size_option("--size-tolerance", &cli.size_tolerance)?;
    let workers = resolve_worker_count(cli.max_tasks.max(0) as usize);

    let search = SearchParams {
        min_quality: cli.min_quality,
        max_quality: cli.max_quality,
        max_iterations: cli.max_iterations,
        tolerance_bytes: tolerance,
        ..SearchParams::default()
    };

    let config = RunConfig::new(&cli.source_path, &cli.dest_path)
        .with_overwrite(cli.overwrite)
        .with_threshold(threshold)
        .with_source_formats(cli.source_formats.as_slice())
        .with_target_format(cli.target_format)
        .with_max_dimension(cli.target_dimension)
        .with_max_bytes(max_bytes)
        .with_workers(workers)
        .with_search(search);
    config.validate()?;
    Ok(config)
}

/// Returns true when at least one file failed.
fn run(cli: Cli) -> Result<bool> {
    let config = build_config(&cli)?;
    info!(
        source = %config.source_root.display(),
        dest = %config.dest_root.display(),
        threshold = config.threshold_bytes,
        formats = ?config.source_extensions,
        target = config.target_format.extension(),
        max_dimension = config.constraint.max_dimension,
        max_bytes = config.constraint.max_bytes,
        workers = config.workers,
        "Configuration"
    );

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        handler_flag.cancel();
        eprintln!("\n⚠️  Interrupted: finishing files in progress, skipping the rest");
    })
    .context("Failed to install Ctrl-C handler")?;

    let executor = RayonExecutor::new(config.workers)?;
    let show_progress = !cli.verbose && cli.output == OutputFormat::Human;
    let runner = BatchRunner::new(config, executor)
        .with_cancel_flag(cancel)
        .with_progress(show_progress);

    let report = runner.run();
    let summary = report.summary();

    match cli.output {
        OutputFormat::Human => print_summary_report(&summary, report.elapsed, "Image Conversion"),
        OutputFormat::Json => {
            let output = json!({
                "summary": summary,
                "elapsed_secs": report.elapsed.as_secs_f64(),
                "files": report.records(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize summary")?
            );
        }
    }

    Ok(report.has_failures())
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_level(Level::DEBUG);
    if cli.verbose {
        log_config = log_config.with_stderr_level(Level::INFO);
    }
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    if let Err(e) = init_logging("img_convert", log_config) {
        eprintln!("⚠️  Logging disabled: {:#}", e);
    }

    match run(cli) {
        Ok(false) => {}
        Ok(true) => std::process::exit(2),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Fatal error");
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
