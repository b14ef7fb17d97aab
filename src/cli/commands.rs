// CLI command implementations
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use oggopus::{
    ogg_to_wav, probe_reader, wav_to_ogg, ConversionSummary, DecodeOptions, EncoderSettings,
    LibOpus, LinkInfo, Picture,
};
use oggopus::opus::tags::PICTURE_FIELD;

use crate::cli::config::{ApplicationArg, BatchOperation};
use crate::cli::output::ProgressBar;
use crate::cli::{CliResult, Commands, Config, OutputFormatter};

/// Run the selected subcommand
pub fn run(config: &Config) -> CliResult<()> {
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match &config.command {
        Commands::Decode {
            files,
            output,
            rate,
            no_gain,
            chunk_size,
        } => {
            let options = DecodeOptions {
                chunk_size: *chunk_size,
                output_rate: *rate,
                apply_gain: !no_gain,
            };
            command_decode(files, output.as_deref(), &options, &formatter)
        }
        Commands::Encode {
            files,
            output,
            bitrate,
            application,
            comments,
        } => {
            let settings = encoder_settings(*bitrate, *application, comments)?;
            command_encode(files, output.as_deref(), &settings, &formatter)
        }
        Commands::Info { files, detailed } => command_info(files, *detailed, &formatter),
        Commands::Batch {
            directory,
            pattern,
            operation,
        } => command_batch(directory, pattern, *operation, &formatter),
    }
}

#[derive(Serialize)]
struct ConversionReport<'a> {
    source: &'a str,
    destination: String,
    #[serde(flatten)]
    summary: ConversionSummary,
}

/// Decode Ogg/Opus files to WAV
fn command_decode(
    files: &[String],
    output: Option<&str>,
    options: &DecodeOptions,
    formatter: &OutputFormatter,
) -> CliResult<()> {
    let targets = resolve_targets(files, output, "wav")?;

    for (source, destination) in targets {
        let summary = ogg_to_wav(LibOpus, Path::new(&source), &destination, options)
            .with_context(|| format!("Failed to decode {}", source))?;
        formatter.print_success(&format!("{} -> {}", source, destination.display()));
        formatter.output(&ConversionReport {
            source: &source,
            destination: destination.display().to_string(),
            summary,
        })?;
    }
    Ok(())
}

/// Encode WAV files as Ogg/Opus
fn command_encode(
    files: &[String],
    output: Option<&str>,
    settings: &EncoderSettings,
    formatter: &OutputFormatter,
) -> CliResult<()> {
    let targets = resolve_targets(files, output, "opus")?;

    for (source, destination) in targets {
        let summary = wav_to_ogg(LibOpus, Path::new(&source), &destination, settings)
            .with_context(|| format!("Failed to encode {}", source))?;
        formatter.print_success(&format!("{} -> {}", source, destination.display()));
        formatter.output(&ConversionReport {
            source: &source,
            destination: destination.display().to_string(),
            summary,
        })?;
    }
    Ok(())
}

#[derive(Serialize)]
struct FileReport {
    file: String,
    size: u64,
    modified: Option<String>,
    duration_secs: f64,
    total_pages: usize,
    skipped_bytes: usize,
    links: Vec<LinkReport>,
}

#[derive(Serialize)]
struct LinkReport {
    serial: String,
    channels: u8,
    pre_skip: u16,
    input_sample_rate: u32,
    output_gain_db: f64,
    mapping_family: u8,
    duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pictures: Option<Vec<PictureReport>>,
}

#[derive(Serialize)]
struct PictureReport {
    kind: &'static str,
    mime_type: String,
    description: String,
    width: u32,
    height: u32,
    size: usize,
}

impl From<Picture> for PictureReport {
    fn from(picture: Picture) -> Self {
        PictureReport {
            kind: picture.type_name(),
            size: picture.data.len(),
            mime_type: picture.mime_type,
            description: picture.description,
            width: picture.width,
            height: picture.height,
        }
    }
}

impl LinkReport {
    fn new(link: LinkInfo, detailed: bool) -> Self {
        let header = &link.header;
        let tags = link.tags.as_ref().filter(|_| detailed);
        LinkReport {
            serial: format!("{:#010x}", link.serial),
            channels: header.channels,
            pre_skip: header.pre_skip,
            input_sample_rate: header.input_sample_rate,
            output_gain_db: f64::from(header.output_gain) / 256.0,
            mapping_family: header.mapping_family,
            duration_secs: link.duration_secs,
            vendor: tags.map(|t| t.vendor.clone()),
            comments: tags.map(|t| {
                t.comments
                    .iter()
                    .filter(|(field, _)| !field.eq_ignore_ascii_case(PICTURE_FIELD))
                    .map(|(field, value)| format!("{}={}", field, value))
                    .collect()
            }),
            pictures: tags.map(|t| t.pictures().into_iter().map(PictureReport::from).collect()),
        }
    }
}

/// Show stream information
fn command_info(files: &[String], detailed: bool, formatter: &OutputFormatter) -> CliResult<()> {
    if files.is_empty() {
        bail!("No files specified");
    }

    for file_path in files {
        let report = file_report(Path::new(file_path), detailed)
            .with_context(|| format!("Failed to inspect {}", file_path))?;
        formatter.output(&report)?;
    }
    Ok(())
}

fn file_report(path: &Path, detailed: bool) -> CliResult<FileReport> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .ok()
        .map(|time| DateTime::<Utc>::from(time).format("%Y-%m-%d %H:%M:%S UTC").to_string());

    let info = probe_reader(BufReader::new(File::open(path)?))?;
    Ok(FileReport {
        file: path.display().to_string(),
        size: metadata.len(),
        modified,
        duration_secs: info.duration_secs,
        total_pages: info.total_pages,
        skipped_bytes: info.skipped_bytes,
        links: info
            .links
            .into_iter()
            .map(|link| LinkReport::new(link, detailed))
            .collect(),
    })
}

/// Batch process directory
fn command_batch(
    directory: &str,
    pattern: &str,
    operation: BatchOperation,
    formatter: &OutputFormatter,
) -> CliResult<()> {
    // Build glob pattern
    let glob_pattern = if pattern.contains('*') || pattern.contains('?') {
        format!("{}/{}", directory, pattern)
    } else {
        format!("{}/**/{}", directory, pattern)
    };

    // Find matching files
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in glob::glob(&glob_pattern).context("Invalid glob pattern")? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => formatter.print_error(&format!("Error reading path: {}", e)),
        }
    }

    let total = files.len();
    if total == 0 {
        formatter.print_info("No files found matching pattern");
        return Ok(());
    }
    formatter.print_info(&format!("Running {} on {} files...", operation, total));

    let decode_options = DecodeOptions::default();
    let encoder_settings = EncoderSettings::default();
    let mut progress = ProgressBar::new(total, !formatter.quiet());
    let mut success_count = 0;
    let mut error_count = 0;

    for path in &files {
        let result: CliResult<()> = match operation {
            BatchOperation::Decode => {
                ogg_to_wav(LibOpus, path, &path.with_extension("wav"), &decode_options)
                    .map(|_| ())
                    .map_err(Into::into)
            }
            BatchOperation::Encode => {
                wav_to_ogg(LibOpus, path, &path.with_extension("opus"), &encoder_settings)
                    .map(|_| ())
                    .map_err(Into::into)
            }
            BatchOperation::Info => {
                file_report(path, false).and_then(|report| formatter.output(&report))
            }
        };
        progress.increment(&path.display().to_string());

        match result {
            Ok(()) => success_count += 1,
            Err(e) => {
                formatter.print_error(&format!("{}: {:#}", path.display(), e));
                error_count += 1;
            }
        }
    }

    debug!(success_count, error_count, "batch finished");
    formatter.print_info(&format!(
        "Completed: {} successful, {} errors",
        success_count, error_count
    ));
    Ok(())
}

/// Pair each input with its output path
fn resolve_targets(
    files: &[String],
    output: Option<&str>,
    extension: &str,
) -> CliResult<Vec<(String, PathBuf)>> {
    match (files, output) {
        ([], _) => bail!("No files specified"),
        ([single], Some(output)) => Ok(vec![(single.clone(), PathBuf::from(output))]),
        (_, Some(_)) => bail!("--output can only be used with a single input file"),
        (files, None) => Ok(files
            .iter()
            .map(|file| (file.clone(), Path::new(file).with_extension(extension)))
            .collect()),
    }
}

fn encoder_settings(
    bitrate: Option<i32>,
    application: ApplicationArg,
    comments: &[String],
) -> CliResult<EncoderSettings> {
    let mut settings = EncoderSettings {
        bitrate,
        application: application.into(),
        ..EncoderSettings::default()
    };
    for comment in comments {
        let Some((field, value)) = comment.split_once('=') else {
            bail!("Comment '{}' is not FIELD=value", comment);
        };
        settings.comments.push((field.to_string(), value.to_string()));
    }
    Ok(settings)
}
