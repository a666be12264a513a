use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;

use subcue::batch::{load_jobs, run_batch, BatchOptions};
use subcue::config::{load_config, SubcueConfig};
use subcue::error_codes::{classify, CodedError, INVALID_CONFIG};
use subcue::subtitle_file::{load_character_record, write_document};
use subcue::{convert, WordAggregator};

#[derive(Debug, Parser)]
#[command(name = "subcue")]
#[command(version = env!("SUBCUE_VERSION"))]
#[command(about = "Aggregate per-character speech timing into word-level caption cues")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args)]
struct ConfigArgs {
    /// YAML config file
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Overrides aggregator.merge_threshold
    #[arg(long = "merge-threshold")]
    merge_threshold: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert one character-data JSON file into a subtitle document
    Convert {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long)]
        json: bool,
    },
    /// Validate a character-data JSON file without writing anything
    Check {
        input: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long)]
        json: bool,
    },
    /// Write subtitles for every job of a job list
    Batch {
        jobs: PathBuf,
        #[arg(long = "out-dir")]
        out_dir: PathBuf,
        /// Rewrite subtitles that already exist
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Convert { .. } => "convert",
            Commands::Check { .. } => "check",
            Commands::Batch { .. } => "batch",
        }
    }

    fn json(&self) -> bool {
        match self {
            Commands::Convert { json, .. }
            | Commands::Check { json, .. }
            | Commands::Batch { json, .. } => *json,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let name = cli.command.name();
    let json = cli.command.json();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            json,
        } => run_convert(&input, &output, &config, json),
        Commands::Check {
            input,
            config,
            json,
        } => run_check(&input, &config, json),
        Commands::Batch {
            jobs,
            out_dir,
            force,
            config,
            json,
        } => run_batch_command(&jobs, out_dir, force, &config, json),
    };

    if let Err(error) = result {
        let coded = classify(&error);
        if json {
            match serde_json::to_string(&coded.envelope()) {
                Ok(envelope) => eprintln!("{envelope}"),
                Err(_) => eprintln!("subcue {name}: {error:#}"),
            }
        } else {
            eprintln!("subcue {name}: {error:#}");
        }
        process::exit(coded.exit_code());
    }
}

fn resolve_config(args: &ConfigArgs) -> Result<SubcueConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path).map_err(|error| {
            anyhow::Error::new(
                CodedError::usage(INVALID_CONFIG, format!("{error:#}"))
                    .with_details(json!({ "path": path.display().to_string() })),
            )
        })?,
        None => SubcueConfig::default(),
    };
    if let Some(merge_threshold) = args.merge_threshold {
        config.aggregator.merge_threshold = merge_threshold;
    }
    Ok(config)
}

fn run_convert(input: &Path, output: &Path, args: &ConfigArgs, json: bool) -> Result<()> {
    let config = resolve_config(args)?;
    let record = load_character_record(input)?;
    let document = convert(record, &WordAggregator::new(config.aggregator))
        .with_context(|| format!("failed converting {}", input.display()))?;
    let written = write_document(output, &document, config.output.indent)?;

    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "output": written.path.display().to_string(),
                "cues": document.transcription.len(),
                "output_hash": written.sha256,
                "bytes": written.bytes,
            })
        );
    } else {
        println!(
            "Wrote {} ({} cues)",
            written.path.display(),
            document.transcription.len()
        );
    }
    Ok(())
}

fn run_check(input: &Path, args: &ConfigArgs, json: bool) -> Result<()> {
    let config = resolve_config(args)?;
    let record = load_character_record(input)?;
    let characters = record.characters.as_ref().map_or(0, Vec::len);
    let document = convert(record, &WordAggregator::new(config.aggregator))
        .with_context(|| format!("failed validating {}", input.display()))?;

    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "characters": characters,
                "cues": document.transcription.len(),
            })
        );
    } else {
        println!(
            "OK: {} ({} characters, {} cues)",
            input.display(),
            characters,
            document.transcription.len()
        );
    }
    Ok(())
}

fn run_batch_command(
    jobs_path: &Path,
    out_dir: PathBuf,
    force: bool,
    args: &ConfigArgs,
    json: bool,
) -> Result<()> {
    let config = resolve_config(args)?;
    let jobs = load_jobs(jobs_path)?;
    info!("processing {} jobs from {}", jobs.len(), jobs_path.display());

    let summary = run_batch(jobs, &config, &BatchOptions { out_dir, force })?;

    if json {
        let encoded =
            serde_json::to_string(&summary).context("failed to serialize batch summary")?;
        println!("{encoded}");
    } else {
        println!(
            "Batch done: {} written, {} skipped, {} failed",
            summary.written.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        for failed in &summary.failed {
            let id = failed
                .uuid
                .as_deref()
                .or(failed.raw_uuid.as_deref())
                .unwrap_or("<invalid>");
            println!("  job #{} {}: {}", failed.index, id, failed.reason);
        }
    }
    Ok(())
}
