// Shared fixture for integration tests: shard directories and input files in a temp dir

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wordmend::BucketKey;

pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
    pub dictionary_dir: PathBuf,
}

impl TestFixture {
    /// Create a new fixture with an empty dictionary directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();
        let dictionary_dir = root_path.join("dictionary");
        fs::create_dir_all(&dictionary_dir).expect("Failed to create dictionary directory");

        Self {
            temp_dir,
            root_path,
            dictionary_dir,
        }
    }

    /// Write `words` into their bucket shards, appending to existing shards
    pub fn add_words(&self, words: &[&str]) {
        let mut buckets: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for word in words {
            let key = BucketKey::for_word(word).expect("fixture words need a letter");
            buckets.entry(key.file_name()).or_default().push(word);
        }

        for (file_name, words) in buckets {
            let path = self.dictionary_dir.join(file_name);
            let mut content = fs::read_to_string(&path).unwrap_or_default();
            for word in words {
                content.push_str(word);
                content.push('\n');
            }
            fs::write(&path, content).expect("Failed to write shard");
        }
    }

    /// Remove the shard file for the bucket `word` falls in
    pub fn remove_shard_for(&self, word: &str) {
        let key = BucketKey::for_word(word).expect("word needs a letter");
        let path = self.dictionary_dir.join(key.file_name());
        if path.exists() {
            fs::remove_file(path).expect("Failed to remove shard");
        }
    }

    /// Create an input file relative to the fixture root
    pub fn create_input_file<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write input file");
        file_path
    }
}
