// WHY: Sharded word-membership oracle; words bucket by first two letters into dict-<xy>.txt shards
// Shards load on first use and stay cached; a missing shard is an empty set, `_` marks a non-letter second char

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Placeholder for a missing or non-alphabetic second character
pub const SENTINEL: char = '_';

/// Shard file name prefix and extension
const SHARD_PREFIX: &str = "dict-";
const SHARD_EXTENSION: &str = "txt";

/// Word membership test shared by every worker
pub trait Lexicon: Send + Sync {
    /// Whether `word` is a known word
    fn contains(&self, word: &str) -> bool;
}

impl Lexicon for HashSet<String> {
    fn contains(&self, word: &str) -> bool {
        is_lookup_candidate(word) && HashSet::contains(self, word)
    }
}

impl<L: Lexicon + ?Sized> Lexicon for Arc<L> {
    fn contains(&self, word: &str) -> bool {
        (**self).contains(word)
    }
}

/// Only words with at least one letter and no digit are ever known
pub fn is_lookup_candidate(word: &str) -> bool {
    !has_digit(word) && word.chars().any(|c| c.is_ascii_lowercase())
}

pub fn has_digit(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit())
}

/// Two-character shard selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    first: char,
    second: char,
}

impl BucketKey {
    /// Derive the bucket for a normalized word.
    ///
    /// Uses the first letter of the word and the character right after it,
    /// substituting [`SENTINEL`] when that character is absent or not a
    /// letter. Returns `None` for words without any letter.
    pub fn for_word(word: &str) -> Option<Self> {
        let mut chars = word.chars().skip_while(|c| !c.is_ascii_lowercase());
        let first = chars.next()?;
        let second = match chars.next() {
            Some(c) if c.is_ascii_lowercase() => c,
            _ => SENTINEL,
        };
        Some(Self { first, second })
    }

    /// File name of the shard holding this bucket
    pub fn file_name(&self) -> String {
        format!("{SHARD_PREFIX}{}{}.{SHARD_EXTENSION}", self.first, self.second)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.first, self.second)
    }
}

/// Fatal dictionary problems detected at startup
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Dictionary directory does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("Dictionary path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("No dictionary shards (dict-*.txt) found in {0}")]
    NoShards(PathBuf),

    #[error("Invalid shard search pattern: {0}")]
    Pattern(String),
}

type WordSet = HashSet<String>;

/// Lazily loaded, shard-per-bucket dictionary rooted at a directory
pub struct ShardedDictionary {
    root: PathBuf,
    // Outer lock only guards slot creation; each slot loads at most once
    shards: RwLock<HashMap<BucketKey, Arc<OnceLock<WordSet>>>>,
}

impl ShardedDictionary {
    /// Open a dictionary directory, refusing to run without any shard.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(DictionaryError::MissingRoot(root));
        }
        if !root.is_dir() {
            return Err(DictionaryError::NotADirectory(root));
        }

        let shard_count = count_shard_files(&root)?;
        if shard_count == 0 {
            return Err(DictionaryError::NoShards(root));
        }

        info!("Opened dictionary at {} with {} shard files", root.display(), shard_count);
        Ok(Self::new_unchecked(root))
    }

    /// Build a dictionary without checking that any shard exists
    pub fn new_unchecked(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            shards: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the shard file for `key`
    pub fn shard_path(&self, key: BucketKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Number of buckets loaded so far
    pub fn loaded_shards(&self) -> usize {
        match self.shards.read() {
            Ok(shards) => shards.values().filter(|slot| slot.get().is_some()).count(),
            Err(poisoned) => poisoned
                .into_inner()
                .values()
                .filter(|slot| slot.get().is_some())
                .count(),
        }
    }

    fn slot(&self, key: BucketKey) -> Arc<OnceLock<WordSet>> {
        if let Ok(shards) = self.shards.read() {
            if let Some(slot) = shards.get(&key) {
                return Arc::clone(slot);
            }
        }

        let mut shards = match self.shards.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(shards.entry(key).or_default())
    }

    fn load_shard(&self, key: BucketKey) -> WordSet {
        let path = self.shard_path(key);
        match fs::read_to_string(&path) {
            Ok(content) => {
                let words: WordSet = content
                    .lines()
                    .map(str::trim_end)
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned)
                    .collect();
                debug!("Loaded shard {}: {} words", key, words.len());
                words
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No shard for bucket {} at {}", key, path.display());
                WordSet::new()
            }
            Err(e) => {
                warn!("Failed to read shard {}: {} (treating bucket as empty)", path.display(), e);
                WordSet::new()
            }
        }
    }
}

impl Lexicon for ShardedDictionary {
    fn contains(&self, word: &str) -> bool {
        if !is_lookup_candidate(word) {
            return false;
        }
        let Some(key) = BucketKey::for_word(word) else {
            return false;
        };

        let slot = self.slot(key);
        slot.get_or_init(|| self.load_shard(key)).contains(word)
    }
}

impl fmt::Debug for ShardedDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedDictionary")
            .field("root", &self.root)
            .field("loaded_shards", &self.loaded_shards())
            .finish()
    }
}

fn count_shard_files(root: &Path) -> Result<usize, DictionaryError> {
    let pattern = root.join(format!("{SHARD_PREFIX}*.{SHARD_EXTENSION}"));
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern).map_err(|e| DictionaryError::Pattern(e.to_string()))?;

    Ok(paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .count())
}
