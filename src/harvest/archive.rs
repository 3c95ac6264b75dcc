//! Directory-backed answer record store
//!
//! One JSON file per question, named `<prefix><xxh3 of question text>.json`.
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written record that the counter would pick up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::timeout;

use super::questions::HarvestedQuestion;
use crate::backend::RecordStore;

/// Serializing a question is cheap; anything slower is pathological
const SERIALIZATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AnswerArchive {
    dir: PathBuf,
    prefix: String,
}

impl AnswerArchive {
    /// Open (creating if needed) an archive rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create archive directory {}", dir.display()))?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record key of a question; identical texts share one record
    #[must_use]
    pub fn record_key(&self, question_text: &str) -> String {
        let hash = xxhash_rust::xxh3::xxh3_64(question_text.as_bytes());
        format!("{}{hash:016x}", self.prefix)
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Store a question unless a record for it already exists
    ///
    /// Returns `true` if a new record was written.
    pub async fn save(&self, question: &HarvestedQuestion) -> Result<bool> {
        let key = self.record_key(&question.text);
        let path = self.record_path(&key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }

        let owned = question.clone();
        let task = tokio::task::spawn_blocking(move || serde_json::to_vec_pretty(&owned));
        let bytes = match timeout(SERIALIZATION_TIMEOUT, task).await {
            Ok(Ok(result)) => result.context("Failed to serialize answer record")?,
            Ok(Err(e)) => return Err(anyhow::anyhow!("Serialization task panicked: {e}")),
            Err(_) => {
                return Err(anyhow::anyhow!(
                    "Serialization timed out after {SERIALIZATION_TIMEOUT:?}"
                ));
            }
        };

        let tmp_path = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp_path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to move record into place: {}", path.display()))?;

        log::debug!(target: "lms_autoscan::harvest", "Saved record {key}");
        Ok(true)
    }

    /// Store every question, returning how many records were new
    pub async fn save_all(&self, questions: &[HarvestedQuestion]) -> Result<usize> {
        let mut saved = 0;
        for question in questions {
            if self.save(question).await? {
                saved += 1;
            }
        }
        Ok(saved)
    }

    pub async fn load(&self, key: &str) -> Result<Option<HarvestedQuestion>> {
        let path = self.record_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let question = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Corrupt record {}", path.display()))?;
                Ok(Some(question))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

#[async_trait]
impl RecordStore for AnswerArchive {
    async fn count_records_with_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(prefix) && name.ends_with(".json") {
                count += 1;
            }
        }
        Ok(count)
    }
}
