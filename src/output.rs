// WHY: Writers for cleaned rows and the per-run summary
// Cleaned rows keep their input order and original column shape

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::unit::UnitOutcome;

/// Column names of the original page export
pub const OUTPUT_HEADER: &[&str] = &["Page", "Words", "Page Number", "Day", "Month", "Year"];

/// Output path for a source file: `<stem>_clean.<ext>` next to the source
/// or inside `output_dir` when one is given
pub fn generate_output_path(source_path: &Path, output_dir: Option<&Path>) -> PathBuf {
    let file_stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    let file_name = match source_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{file_stem}_clean.{ext}"),
        None => format!("{file_stem}_clean"),
    };

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => source_path.with_file_name(file_name),
    }
}

/// Write successful outcomes in order, skipping failed units.
/// Returns the number of rows written.
pub async fn write_cleaned_file(
    path: &Path,
    outcomes: &[UnitOutcome],
    header: bool,
    delimiter: char,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    let separator = delimiter.to_string();

    if header {
        writer.write_all(OUTPUT_HEADER.join(separator.as_str()).as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    let mut written = 0usize;
    for cleaned in outcomes.iter().filter_map(|outcome| outcome.as_ref().ok()) {
        writer.write_all(cleaned.to_fields().join(separator.as_str()).as_bytes()).await?;
        writer.write_all(b"\n").await?;
        written += 1;
    }

    writer.flush().await?;
    Ok(written)
}

/// Per-file processing statistics
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FileStats {
    /// Input file path
    pub path: String,
    /// Output file path, absent when nothing was written
    pub output: Option<String>,
    pub units_processed: u64,
    pub units_failed: u64,
    pub tokens: u64,
    pub unknown_words: u64,
    pub processing_time_ms: u64,
    /// Processing status (success, partial, failed)
    pub status: String,
    pub error: Option<String>,
}

impl FileStats {
    /// Tally a finished batch
    pub fn from_outcomes(path: &Path, outcomes: &[UnitOutcome]) -> Self {
        let mut stats = Self {
            path: path.display().to_string(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(cleaned) => {
                    stats.units_processed += 1;
                    stats.tokens += cleaned.tokens as u64;
                    stats.unknown_words += cleaned.unknown_words as u64;
                }
                Err(_) => stats.units_failed += 1,
            }
        }
        stats.status = if stats.units_failed == 0 { "success" } else { "partial" }.to_string();
        stats
    }

    pub fn failed(path: &Path, error: impl Into<String>) -> Self {
        Self {
            path: path.display().to_string(),
            status: "failed".to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Whole-run summary
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RunStats {
    pub files: Vec<FileStats>,
    pub units_processed: u64,
    pub units_failed: u64,
    pub unknown_words: u64,
    pub total_time_ms: u64,
}

impl RunStats {
    pub fn push(&mut self, file: FileStats) {
        self.units_processed += file.units_processed;
        self.units_failed += file.units_failed;
        self.unknown_words += file.unknown_words;
        self.files.push(file);
    }
}

/// Write the run summary as pretty JSON
pub async fn write_run_stats(path: &Path, stats: &RunStats) -> Result<()> {
    let content = serde_json::to_string_pretty(stats)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}
