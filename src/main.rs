use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use wordmend::discovery::{collect_input_files, DiscoveryConfig};
use wordmend::output::{generate_output_path, write_cleaned_file, write_run_stats, FileStats, RunStats};
use wordmend::reader::{AsyncRowReader, ReaderConfig};
use wordmend::{
    Engine, EngineConfig, FileReporter, NullReporter, ReportConfig, ReportFormat, ShardedDictionary,
    UnknownWordSink,
};

#[derive(Parser, Debug)]
#[command(name = "wordmend")]
#[command(about = "Rejoin OCR-split words in delimited page exports using a sharded dictionary")]
#[command(version)]
struct Args {
    /// Input files or directories (directories are searched for *.<extension>)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory holding dict-<xy>.txt shard files
    #[arg(long)]
    dictionary: PathBuf,

    /// Write cleaned files here instead of next to each input
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Units processed in parallel (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Unknown-word log path (appended to)
    #[arg(long, default_value = "unknown_words.csv")]
    report: PathBuf,

    /// Unknown-word log format: csv or jsonl
    #[arg(long, default_value_t = ReportFormat::Csv)]
    report_format: ReportFormat,

    /// Extension searched for inside input directories
    #[arg(long, default_value = "tsv")]
    extension: String,

    /// Inputs start with a header row; outputs get one too
    #[arg(long)]
    header: bool,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,

    /// Log at debug level
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .json()
        .init();

    info!("Starting wordmend");
    info!(?args, "Parsed CLI arguments");

    // Fatal: no shard at all means every token would be unknown
    let dictionary = ShardedDictionary::open(&args.dictionary)?;

    let report_config = ReportConfig {
        path: args.report.clone(),
        format: args.report_format,
    };
    let sink: Arc<dyn UnknownWordSink> = match FileReporter::open(&report_config) {
        Ok(reporter) => Arc::new(reporter),
        Err(e) => {
            error!("Cannot open unknown-word log {}: {} (continuing without it)", report_config.path.display(), e);
            Arc::new(NullReporter)
        }
    };

    let mut engine_config = EngineConfig::default();
    if let Some(workers) = args.workers {
        engine_config.workers = workers.max(1);
    }
    info!("Using {} workers", engine_config.workers);
    let engine = Engine::new(Arc::new(dictionary), sink, engine_config);

    let discovery_config = DiscoveryConfig {
        fail_fast: args.fail_fast,
        extension: args.extension.clone(),
    };
    let candidates = collect_input_files(&args.inputs, &discovery_config).await?;

    let reader_config = ReaderConfig {
        fail_fast: args.fail_fast,
        has_header: args.header,
        ..Default::default()
    };
    let delimiter = reader_config.delimiter;
    let reader = AsyncRowReader::new(reader_config);

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(candidates.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };

    let run_start = Instant::now();
    let mut run_stats = RunStats::default();

    for candidate in &candidates {
        progress.set_message(candidate.path.display().to_string());

        if let Some(ref issue) = candidate.error {
            run_stats.push(FileStats::failed(&candidate.path, issue.clone()));
            progress.inc(1);
            continue;
        }

        let file_start = Instant::now();
        let (rows, read_stats) = reader.read_rows(&candidate.path).await?;
        if let Some(ref read_error) = read_stats.read_error {
            warn!("Read error for {}: {}", candidate.path.display(), read_error);
        }

        let outcomes = engine.process_rows(rows).await;

        let output_path = generate_output_path(&candidate.path, args.output_dir.as_deref());
        let mut file_stats = FileStats::from_outcomes(&candidate.path, &outcomes);
        match write_cleaned_file(&output_path, &outcomes, args.header, delimiter).await {
            Ok(written) => {
                info!("Wrote {} rows to {}", written, output_path.display());
                file_stats.output = Some(output_path.display().to_string());
            }
            Err(e) if args.fail_fast => return Err(e),
            Err(e) => {
                error!("Failed to write {}: {}", output_path.display(), e);
                file_stats.status = "failed".to_string();
                file_stats.error = Some(e.to_string());
            }
        }
        if file_stats.error.is_none() {
            file_stats.error = read_stats.read_error;
        }
        file_stats.processing_time_ms = file_start.elapsed().as_millis() as u64;
        run_stats.push(file_stats);
        progress.inc(1);
    }

    progress.finish_and_clear();
    run_stats.total_time_ms = run_start.elapsed().as_millis() as u64;

    if let Err(e) = write_run_stats(&args.stats_out, &run_stats).await {
        warn!("Failed to write stats to {}: {}", args.stats_out.display(), e);
    }

    println!("wordmend v{} - processing complete", env!("CARGO_PKG_VERSION"));
    println!("  Files: {}", run_stats.files.len());
    println!("  Units cleaned: {}", run_stats.units_processed);
    if run_stats.units_failed > 0 {
        println!("  Units failed: {}", run_stats.units_failed);
    }
    println!("  Unknown words reported: {}", run_stats.unknown_words);

    info!(
        "Run complete: {} units cleaned, {} failed in {}ms",
        run_stats.units_processed, run_stats.units_failed, run_stats.total_time_ms
    );
    Ok(())
}
