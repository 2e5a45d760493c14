// WHY: Unknown-word audit log, an append-only sink shared by all workers
// One locked write per unit; I/O failures are logged once and never reach the caller

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::resegmenter::ReportEntry;

/// Destination for unresolved tokens.
///
/// Implementations serialize concurrent callers and never surface I/O
/// failures; a lost audit record must not stop text processing.
pub trait UnknownWordSink: Send + Sync {
    /// Append a batch of records (normally everything one unit produced)
    fn append(&self, entries: &[ReportEntry]);
}

/// On-disk record layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `word,before,after` with minimal quoting
    #[default]
    Csv,
    /// One JSON object per line
    JsonLines,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" | "jsonlines" | "json-lines" => Ok(Self::JsonLines),
            other => Err(format!("unknown report format '{other}' (expected csv or jsonl)")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::JsonLines => write!(f, "jsonl"),
        }
    }
}

/// Reporter settings
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub path: PathBuf,
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("unknown_words.csv"),
            format: ReportFormat::Csv,
        }
    }
}

impl ReportFormat {
    /// Render one record, including the trailing newline
    pub fn render(&self, entry: &ReportEntry) -> io::Result<String> {
        match self {
            Self::Csv => Ok(format!(
                "{},{},{}\n",
                csv_field(&entry.word),
                csv_field(&entry.before),
                csv_field(&entry.after)
            )),
            Self::JsonLines => {
                let mut line = serde_json::to_string(entry)?;
                line.push('\n');
                Ok(line)
            }
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// Appends records to a file, one locked write per batch
pub struct FileReporter {
    path: PathBuf,
    format: ReportFormat,
    writer: Mutex<BufWriter<File>>,
    failed: AtomicBool,
}

impl FileReporter {
    /// Open (or create) the log in append mode
    pub fn open(config: &ReportConfig) -> io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&config.path)?;
        info!("Reporting unknown words to {} ({})", config.path.display(), config.format);

        Ok(Self {
            path: config.path.clone(),
            format: config.format,
            writer: Mutex::new(BufWriter::new(file)),
            failed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any write has failed so far
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, BufWriter<File>> {
        match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_batch(&self, entries: &[ReportEntry]) -> io::Result<()> {
        let mut batch = String::new();
        for entry in entries {
            batch.push_str(&self.format.render(entry)?);
        }

        let mut writer = self.lock();
        writer.write_all(batch.as_bytes())?;
        writer.flush()
    }
}

impl UnknownWordSink for FileReporter {
    fn append(&self, entries: &[ReportEntry]) {
        if entries.is_empty() {
            return;
        }
        if let Err(e) = self.write_batch(entries) {
            if !self.failed.swap(true, Ordering::Relaxed) {
                error!(
                    "Unknown-word log {} is failing, records will be dropped: {}",
                    self.path.display(),
                    e
                );
            } else {
                debug!("Dropped {} unknown-word records: {}", entries.len(), e);
            }
        }
    }
}

impl fmt::Debug for FileReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileReporter")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("failed", &self.has_failed())
            .finish()
    }
}

/// Collects records in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub fn entries(&self) -> Vec<ReportEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UnknownWordSink for MemoryReporter {
    fn append(&self, entries: &[ReportEntry]) {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.extend_from_slice(entries);
    }
}

/// Discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl UnknownWordSink for NullReporter {
    fn append(&self, _entries: &[ReportEntry]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(word: &str, before: &str, after: &str) -> ReportEntry {
        ReportEntry {
            word: word.into(),
            before: before.into(),
            after: after.into(),
        }
    }

    #[test]
    fn test_csv_rendering_quotes_only_when_needed() {
        let line = ReportFormat::Csv.render(&entry("xzqy", "the", "")).unwrap();
        assert_eq!(line, "xzqy,the,\n");

        let line = ReportFormat::Csv.render(&entry("a,b", "say \"hi\"", "ok")).unwrap();
        assert_eq!(line, "\"a,b\",\"say \"\"hi\"\"\",ok\n");
    }

    #[test]
    fn test_json_lines_rendering() {
        let line = ReportFormat::JsonLines.render(&entry("xzqy", "the", "end")).unwrap();
        assert_eq!(line, "{\"word\":\"xzqy\",\"before\":\"the\",\"after\":\"end\"}\n");
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("csv".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!("JSONL".parse::<ReportFormat>().unwrap(), ReportFormat::JsonLines);
        assert!("xml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_file_reporter_appends_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let config = ReportConfig {
            path: temp_dir.path().join("reports/unknown.csv"),
            format: ReportFormat::Csv,
        };

        let reporter = FileReporter::open(&config).unwrap();
        reporter.append(&[entry("aa", "", "bb")]);
        reporter.append(&[]);
        drop(reporter);

        let reporter = FileReporter::open(&config).unwrap();
        reporter.append(&[entry("cc", "bb", ""), entry("dd", "cc", "")]);
        assert!(!reporter.has_failed());

        let content = std::fs::read_to_string(&config.path).unwrap();
        assert_eq!(content, "aa,,bb\ncc,bb,\ndd,cc,\n");
    }

    #[test]
    fn test_file_reporter_serializes_concurrent_batches() {
        let temp_dir = TempDir::new().unwrap();
        let config = ReportConfig {
            path: temp_dir.path().join("unknown.jsonl"),
            format: ReportFormat::JsonLines,
        };
        let reporter = Arc::new(FileReporter::open(&config).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let reporter = Arc::clone(&reporter);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        reporter.append(&[entry(&format!("w{t}x{i}"), "p", "n")]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&config.path).unwrap();
        let records: Vec<ReportEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 100);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_file_reporter_write_failure_is_swallowed() {
        // Every write to /dev/full fails with ENOSPC
        let config = ReportConfig {
            path: PathBuf::from("/dev/full"),
            format: ReportFormat::Csv,
        };
        let reporter = FileReporter::open(&config).unwrap();
        assert!(!reporter.has_failed());

        reporter.append(&[entry("xzqy", "the", "end")]);
        assert!(reporter.has_failed());

        reporter.append(&[entry("qqv", "", "")]);
        assert!(reporter.has_failed());
    }

    #[test]
    fn test_memory_reporter_collects() {
        let reporter = MemoryReporter::new();
        assert!(reporter.is_empty());
        reporter.append(&[entry("a", "", ""), entry("b", "a", "")]);
        assert_eq!(reporter.len(), 2);
        assert_eq!(reporter.entries()[1].word, "b");
    }
}
