use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vzip_core::{
    ArchiveReader, CodecKind, DEFAULT_FRAME_EXTENSION, DirectorySource, DirectorySourceOptions,
    FramePipeline, FrameSource, PipelineConfig, RunStats, VzipError,
};

const LOG_ENV: &str = "VZIP_LOG";
const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_EMPTY_INPUT: i32 = 2;

#[derive(Parser)]
#[command(
    name = "vzip",
    version,
    about = "Parallel frame archiver",
    long_about = "Compress a directory of raster frames into one ordered archive."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress the frames of a directory into an archive.
    Archive {
        /// Directory holding the frames.
        input: PathBuf,

        /// Destination archive path.
        #[arg(short, long, default_value = "video.vzip")]
        output: PathBuf,

        /// Number of worker threads (defaults to CPU count).
        #[arg(long, default_value_t = num_cpus::get())]
        workers: usize,

        /// Per-frame byte limit for raw and encoded frames (supports suffixes K/M/G).
        #[arg(long, default_value = "1M", value_parser = parse_size)]
        max_frame_size: usize,

        /// Frame codec.
        #[arg(long, value_enum, default_value_t = CodecArg::Zlib)]
        codec: CodecArg,

        /// zlib compression level, 0-9.
        #[arg(long, default_value_t = 9)]
        level: u32,

        /// Extension of frame files, matched case-insensitively.
        #[arg(long, default_value = DEFAULT_FRAME_EXTENSION, conflicts_with = "all_files")]
        extension: String,

        /// Archive every regular file of the directory.
        #[arg(long, default_value_t = false)]
        all_files: bool,

        /// Abort when the writer waits longer than this for a single frame.
        #[arg(long)]
        slot_timeout_ms: Option<u64>,

        /// Print the run statistics as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the records of an archive.
    Inspect {
        /// Archive to read.
        input: PathBuf,

        /// Print the record list as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Decode every record of an archive into a directory.
    Extract {
        /// Archive to read.
        input: PathBuf,

        /// Destination directory.
        #[arg(short, long)]
        output: PathBuf,

        /// Codec the archive was written with.
        #[arg(long, value_enum, default_value_t = CodecArg::Zlib)]
        codec: CodecArg,

        /// Extension given to the extracted frame files.
        #[arg(long, default_value = DEFAULT_FRAME_EXTENSION)]
        extension: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodecArg {
    Zlib,
    Lz4,
    Stored,
}

impl CodecArg {
    fn kind(self, level: u32) -> CodecKind {
        match self {
            Self::Zlib => CodecKind::Zlib { level },
            Self::Lz4 => CodecKind::Lz4,
            Self::Stored => CodecKind::Stored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Done,
    EmptyInput,
}

impl Status {
    fn exit_code(self) -> i32 {
        match self {
            Self::Done => EXIT_SUCCESS,
            Self::EmptyInput => EXIT_EMPTY_INPUT,
        }
    }
}

fn main() {
    init_tracing();

    let code = match run() {
        Ok(status) => status.exit_code(),
        Err(error) => {
            eprintln!("error: {error:#}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run() -> Result<Status> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Archive {
            input,
            output,
            workers,
            max_frame_size,
            codec,
            level,
            extension,
            all_files,
            slot_timeout_ms,
            json,
        } => {
            let config = PipelineConfig {
                max_frame_size,
                codec: codec.kind(level),
                slot_wait_timeout: slot_timeout_ms.map(Duration::from_millis),
                ..PipelineConfig::with_workers(workers)
            };
            let options = DirectorySourceOptions {
                extension: (!all_files).then_some(extension),
            };
            archive_command(&input, &output, config, &options, json).map(|(status, _)| status)
        }
        Commands::Inspect { input, json } => {
            inspect_command(&input, json)?;
            Ok(Status::Done)
        }
        Commands::Extract {
            input,
            output,
            codec,
            extension,
        } => {
            extract_command(&input, &output, codec.kind(9), &extension)?;
            Ok(Status::Done)
        }
    }
}

fn archive_command(
    input: &Path,
    output: &Path,
    config: PipelineConfig,
    options: &DirectorySourceOptions,
    json: bool,
) -> Result<(Status, RunStats)> {
    let source = DirectorySource::with_options(input, options)
        .with_context(|| format!("listing frames in {}", input.display()))?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        frames = source.frame_count(),
        workers = config.workers,
        codec = config.codec.name(),
        "archiving frames"
    );
    let pipeline = FramePipeline::new(config)?;
    let stats = pipeline
        .archive_to_path(Arc::new(source), output)
        .with_context(|| format!("archiving {} into {}", input.display(), output.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(input, output, &stats);
    }

    // An empty directory still produces an (empty) archive.
    if stats.is_empty() {
        eprintln!("warning: {} in {}", VzipError::EmptyInput, input.display());
        return Ok((Status::EmptyInput, stats));
    }
    Ok((Status::Done, stats))
}

#[derive(Serialize)]
struct RecordEntry {
    frame: usize,
    length: usize,
}

fn inspect_command(input: &Path, json: bool) -> Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut entries = Vec::new();
    for record in ArchiveReader::new(BufReader::new(file)) {
        let record = record?;
        entries.push(RecordEntry {
            frame: record.frame.index(),
            length: record.payload.len(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let total: u64 = entries.iter().map(|entry| entry.length as u64).sum();
    println!("{}: {} records, {}", input.display(), entries.len(), format_bytes(total));
    for entry in &entries {
        println!("  #{:06} {:>12}", entry.frame, entry.length);
    }
    Ok(())
}

fn extract_command(input: &Path, output: &Path, codec: CodecKind, extension: &str) -> Result<()> {
    if output.exists() && !output.is_dir() {
        bail!("{} exists and is not a directory", output.display());
    }
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;

    let codec = codec.build()?;
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut restored = 0u64;
    let mut frames = 0usize;
    let mut decoded = Vec::new();
    for record in ArchiveReader::new(BufReader::new(file)) {
        let record = record?;
        decoded.clear();
        codec
            .decode(&record.payload, &mut decoded)
            .with_context(|| format!("decoding record {}", record.frame))?;

        let path = output.join(format!("frame_{:06}.{extension}", record.frame.index()));
        fs::write(&path, &decoded).with_context(|| format!("writing {}", path.display()))?;
        restored += decoded.len() as u64;
        frames += 1;
    }

    println!(
        "extracted {frames} frames ({}) into {}",
        format_bytes(restored),
        output.display()
    );
    Ok(())
}

fn print_summary(input: &Path, output: &Path, stats: &RunStats) {
    match stats.compression_ratio() {
        Some(ratio) => println!("Compression rate: {ratio:.2}%"),
        None => println!("Compression rate: n/a (no input bytes)"),
    }
    println!("Time: {:.2} seconds", stats.elapsed.as_secs_f64());

    println!("  source: {} ({} frames)", input.display(), stats.frames);
    println!(
        "  output: {} ({}, crc32 {:08x})",
        output.display(),
        format_bytes(stats.archive.bytes),
        stats.archive.crc32
    );
    println!("  codec: {}", stats.codec);
    println!("  input bytes: {}", format_bytes(stats.total_in()));
    println!("  output bytes: {}", format_bytes(stats.total_out()));

    let workers = &stats.pool.workers;
    let tasks = workers.iter().map(|worker| worker.tasks_completed);
    let min_tasks = tasks.clone().min().unwrap_or(0);
    let max_tasks = tasks.max().unwrap_or(0);
    println!(
        "  scheduler: {} workers | task balance min/max {min_tasks}/{max_tasks}",
        workers.len()
    );
    for worker in workers {
        println!(
            "    w{:02} frames {:>6} | busy {:>8} | idle {:>8} | util {:>6.2}%",
            worker.worker_id,
            worker.tasks_completed,
            format_duration(worker.busy),
            format_duration(worker.idle),
            worker.utilization * 100.0,
        );
    }
}

fn parse_size(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let split_at = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (num_part, suffix_part) = trimmed.split_at(split_at);
    if num_part.is_empty() {
        return Err(format!("invalid size: {value}"));
    }

    let base: usize = num_part
        .parse()
        .map_err(|_| format!("invalid size number: {value}"))?;

    let multiplier = match suffix_part.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1usize,
        "k" | "kb" => 1024,
        "m" | "mb" => 1024 * 1024,
        "g" | "gb" => 1024 * 1024 * 1024,
        other => return Err(format!("invalid size suffix '{other}' in '{value}'")),
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: {value}"))
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        format!("{minutes:02}:{seconds:02}")
    } else {
        format!("{seconds}.{:03}s", duration.subsec_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_suffixes() {
        assert_eq!(parse_size("1M"), Ok(1024 * 1024));
        assert_eq!(parse_size("64k"), Ok(64 * 1024));
        assert_eq!(parse_size("512"), Ok(512));
        assert!(parse_size("12x").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn formats_bytes_with_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn all_files_conflicts_with_explicit_extension() {
        let parsed = Cli::try_parse_from(["vzip", "archive", "frames", "--all-files"]);
        assert!(parsed.is_ok());

        let conflicting = Cli::try_parse_from([
            "vzip",
            "archive",
            "frames",
            "--all-files",
            "--extension",
            "png",
        ]);
        assert!(conflicting.is_err());
    }

    #[test]
    fn empty_directory_archives_with_its_own_exit_status() -> Result<()> {
        let frames = tempfile::tempdir()?;
        let out_dir = tempfile::tempdir()?;
        let output = out_dir.path().join("video.vzip");

        let (status, stats) = archive_command(
            frames.path(),
            &output,
            PipelineConfig::with_workers(2),
            &DirectorySourceOptions::default(),
            true,
        )?;

        assert_eq!(status, Status::EmptyInput);
        assert_eq!(status.exit_code(), 2);
        assert_eq!(Status::Done.exit_code(), 0);
        assert_eq!(stats.compression_ratio(), None);
        assert_eq!(fs::metadata(&output)?.len(), 0);
        Ok(())
    }

    #[test]
    fn zero_workers_is_rejected_before_archiving() -> Result<()> {
        let frames = tempfile::tempdir()?;
        fs::write(frames.path().join("f0.ppm"), b"P6 1 1 255 abc")?;
        let out_dir = tempfile::tempdir()?;
        let output = out_dir.path().join("video.vzip");

        let result = archive_command(
            frames.path(),
            &output,
            PipelineConfig::with_workers(0),
            &DirectorySourceOptions::default(),
            true,
        );

        let error = result.expect_err("zero workers");
        assert!(matches!(
            error.downcast_ref::<VzipError>(),
            Some(VzipError::InvalidConfig(_))
        ));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn missing_input_directory_fails() {
        let out_dir = tempfile::tempdir().expect("tempdir");
        let result = archive_command(
            &out_dir.path().join("missing"),
            &out_dir.path().join("video.vzip"),
            PipelineConfig::with_workers(1),
            &DirectorySourceOptions::default(),
            true,
        );
        assert!(result.is_err());
    }
}
