use anyhow::Result;
use glob::glob;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Configuration for input discovery behavior
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Extension searched for inside directories
    pub extension: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            extension: "tsv".to_string(),
        }
    }
}

/// Result of input validation
#[derive(Debug, Clone)]
pub struct FileValidation {
    pub path: PathBuf,
    pub error: Option<String>,
}

/// Expand the given inputs into candidate files.
///
/// Files are taken as given. Directories are searched recursively for
/// `*.<extension>`, skipping files this tool wrote (`*_clean.<extension>`).
/// Every candidate is validated; without `fail_fast` problems are recorded
/// on the candidate instead of aborting discovery.
pub async fn collect_input_files(inputs: &[PathBuf], config: &DiscoveryConfig) -> Result<Vec<FileValidation>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for path in glob_directory(input, config)? {
                files.push(validate_file(path, config).await?);
            }
        } else {
            files.push(validate_file(input.clone(), config).await?);
        }
    }

    let valid_count = files.iter().filter(|f| f.error.is_none()).count();
    let invalid_count = files.len() - valid_count;
    if invalid_count > 0 {
        warn!("Found {} inputs with validation issues", invalid_count);
    }
    info!("Input discovery summary: {} valid, {} invalid", valid_count, invalid_count);

    Ok(files)
}

fn glob_directory(root_dir: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.{}", root_dir.display(), config.extension);
    debug!("Starting input discovery with pattern: {}", pattern);

    let output_suffix = format!("_clean.{}", config.extension);
    let mut paths = Vec::new();

    for entry in glob(&pattern).map_err(|e| anyhow::anyhow!("Failed to create glob pattern: {}", e))? {
        match entry {
            Ok(path) => {
                let is_output = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&output_suffix));
                if is_output {
                    debug!("Skipping previous output: {}", path.display());
                    continue;
                }
                paths.push(path);
            }
            Err(e) => {
                let error_msg = format!("Glob iteration error: {e}");
                warn!("{}", error_msg);
                if config.fail_fast {
                    anyhow::bail!(error_msg);
                }
            }
        }
    }

    paths.sort();
    Ok(paths)
}

async fn validate_file(path: PathBuf, config: &DiscoveryConfig) -> Result<FileValidation> {
    debug!("Validating input: {}", path.display());

    match fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => Ok(FileValidation { path, error: None }),
        Ok(_) => {
            let error = format!("Path is not a file: {}", path.display());
            warn!("{}", error);
            Ok(FileValidation { path, error: Some(error) })
        }
        Err(e) => {
            let error = format!("Cannot access file {}: {}", path.display(), e);
            warn!("{}", error);
            if config.fail_fast {
                return Err(anyhow::anyhow!(error));
            }
            Ok(FileValidation { path, error: Some(error) })
        }
    }
}
