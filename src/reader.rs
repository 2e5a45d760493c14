use anyhow::Result;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::unit::RawRow;

/// Configuration for row reading behavior
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
    /// Skip the first line of every file
    pub has_header: bool,
    /// Field separator within a line
    pub delimiter: char,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            buffer_size: 8192,
            has_header: false,
            delimiter: '\t',
        }
    }
}

/// Statistics for one file read
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub rows_read: u64,
    pub bytes_read: u64,
    pub duration_ms: u64,
    pub read_error: Option<String>,
}

/// Async reader that turns a delimited text file into raw rows
pub struct AsyncRowReader {
    config: ReaderConfig,
}

impl AsyncRowReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read every non-blank line as a [`RawRow`] with its 1-based line number.
    ///
    /// Without `fail_fast`, open and decode errors are recorded in the
    /// returned stats and whatever was read before the error is kept.
    pub async fn read_rows<P: AsRef<Path>>(&self, file_path: P) -> Result<(Vec<RawRow>, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();

        debug!("Starting async read of file: {}", path.display());

        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                let error_msg = format!("Failed to open file {}: {}", path.display(), e);
                warn!("{}", error_msg);

                if self.config.fail_fast {
                    return Err(anyhow::anyhow!(error_msg));
                }
                let stats = ReadStats {
                    file_path: path.display().to_string(),
                    rows_read: 0,
                    bytes_read: 0,
                    duration_ms: start_time.elapsed().as_millis() as u64,
                    read_error: Some(error_msg),
                };
                return Ok((Vec::new(), stats));
            }
        };

        let reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut lines = reader.lines();
        let mut rows = Vec::new();
        let mut line_number = 0usize;
        let mut byte_count = 0u64;

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    line_number += 1;
                    byte_count += line.len() as u64 + 1;

                    if line_number == 1 && self.config.has_header {
                        continue;
                    }
                    let line = line.strip_suffix('\r').unwrap_or(&line);
                    if line.trim().is_empty() {
                        continue;
                    }
                    rows.push(RawRow::parse(line_number, line, self.config.delimiter));
                }
                Ok(None) => break,
                Err(e) => {
                    let error_msg = format!(
                        "UTF-8 decoding error in {} at line {}: {}",
                        path.display(),
                        line_number + 1,
                        e
                    );
                    warn!("{}", error_msg);

                    if self.config.fail_fast {
                        return Err(anyhow::anyhow!(error_msg));
                    }
                    let stats = ReadStats {
                        file_path: path.display().to_string(),
                        rows_read: rows.len() as u64,
                        bytes_read: byte_count,
                        duration_ms: start_time.elapsed().as_millis() as u64,
                        read_error: Some(error_msg),
                    };
                    return Ok((rows, stats));
                }
            }
        }

        let stats = ReadStats {
            file_path: path.display().to_string(),
            rows_read: rows.len() as u64,
            bytes_read: byte_count,
            duration_ms: start_time.elapsed().as_millis() as u64,
            read_error: None,
        };

        info!(
            "Read {}: {} rows, {} bytes in {}ms",
            path.display(),
            stats.rows_read,
            byte_count,
            stats.duration_ms
        );
        Ok((rows, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    async fn create_test_file(dir: &Path, name: &str, content: &str) -> Result<std::path::PathBuf> {
        let file_path = dir.join(name);
        fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    #[tokio::test]
    async fn test_read_rows_basic() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncRowReader::new(ReaderConfig::default());

        let content = "p1\tfirst page\t1\np2\tsecond page\t2\n";
        let file_path = create_test_file(temp_dir.path(), "pages.tsv", content).await.unwrap();

        let (rows, stats) = reader.read_rows(&file_path).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[0].fields, vec!["p1", "first page", "1"]);
        assert_eq!(rows[1].fields[1], "second page");
        assert_eq!(stats.rows_read, 2);
        assert!(stats.read_error.is_none());
    }

    #[tokio::test]
    async fn test_read_rows_header_blank_lines_and_crlf() {
        let temp_dir = TempDir::new().unwrap();
        let config = ReaderConfig { has_header: true, ..Default::default() };
        let reader = AsyncRowReader::new(config);

        let content = "Page\tWords\r\np1\tone\r\n\r\np2\ttwo\r\n";
        let file_path = create_test_file(temp_dir.path(), "pages.tsv", content).await.unwrap();

        let (rows, _stats) = reader.read_rows(&file_path).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].fields, vec!["p1", "one"]);
        assert_eq!(rows[1].line, 4);
    }

    #[tokio::test]
    async fn test_read_rows_custom_delimiter() {
        let temp_dir = TempDir::new().unwrap();
        let config = ReaderConfig { delimiter: '|', ..Default::default() };
        let reader = AsyncRowReader::new(config);

        let file_path = create_test_file(temp_dir.path(), "pages.txt", "a|b c|d").await.unwrap();
        let (rows, _stats) = reader.read_rows(&file_path).await.unwrap();
        assert_eq!(rows[0].fields, vec!["a", "b c", "d"]);
    }

    #[tokio::test]
    async fn test_read_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncRowReader::new(ReaderConfig::default());

        let (rows, stats) = reader.read_rows(temp_dir.path().join("missing.tsv")).await.unwrap();
        assert!(rows.is_empty());
        assert!(stats.read_error.is_some());

        let reader = AsyncRowReader::new(ReaderConfig { fail_fast: true, ..Default::default() });
        assert!(reader.read_rows(temp_dir.path().join("missing.tsv")).await.is_err());
    }

    #[tokio::test]
    async fn test_read_invalid_utf8_keeps_earlier_rows() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncRowReader::new(ReaderConfig::default());

        let file_path = temp_dir.path().join("bad.tsv");
        let mut bytes = b"p1\tgood\n".to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFE, b'\n']);
        std::fs::write(&file_path, bytes).unwrap();

        let (rows, stats) = reader.read_rows(&file_path).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(stats.read_error.is_some());
    }
}
