//! Posted-animal ledger.
//!
//! The ledger is the only durable state of the pipeline: a flat JSON file
//! holding every animal id that has already been published.
//!
//! ```text
//! {data_dir}/
//! ├── posted_abandoned_animals.json
//! └── posted_lost_animals.json
//! ```
//!
//! Ids are only ever added, and only after the platform confirms a publish.
//! There is no eviction and no locking; one process owns the file per run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// On-disk shape of the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    posted_ids: Vec<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

/// Set of already-posted animal ids backed by a JSON file.
#[derive(Debug, Clone)]
pub struct PostedLedger {
    path: PathBuf,
    ids: BTreeSet<String>,
    last_updated: Option<String>,
}

impl PostedLedger {
    /// Empty ledger that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: BTreeSet::new(),
            last_updated: None,
        }
    }

    /// Load the ledger; a missing file is an empty ledger.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No ledger at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let file: LedgerFile = serde_json::from_slice(&bytes)?;
        Ok(Self {
            path,
            ids: file.posted_ids.into_iter().collect(),
            last_updated: file.last_updated,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Record an id; returns `false` if it was already present.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Timestamp of the last persist, `YYYY-MM-DD HH:MM:SS`.
    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    /// Rewrite the whole file atomically (temp file, then rename).
    pub async fn persist(&mut self) -> Result<()> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let file = LedgerFile {
            posted_ids: self.ids.iter().cloned().collect(),
            last_updated: Some(stamp.clone()),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut out = tokio::fs::File::create(&tmp).await?;
        out.write_all(&bytes).await?;
        out.flush().await?;
        drop(out);
        tokio::fs::rename(&tmp, &self.path).await?;

        self.last_updated = Some(stamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_empty_ledger() {
        let tmp = TempDir::new().unwrap();
        let ledger = PostedLedger::load(tmp.path().join("nope.json")).await.unwrap();
        assert!(ledger.is_empty());
        assert!(ledger.last_updated().is_none());
    }

    #[tokio::test]
    async fn persist_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("posted.json");

        let mut ledger = PostedLedger::load(&path).await.unwrap();
        assert!(ledger.add("lost/2026/01/b.jpg"));
        assert!(ledger.add("lost/2026/01/a.jpg"));
        assert!(!ledger.add("lost/2026/01/a.jpg"));
        ledger.persist().await.unwrap();

        let reloaded = PostedLedger::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("lost/2026/01/a.jpg"));
        assert!(reloaded.last_updated().is_some());
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn file_uses_posted_ids_shape() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");

        let mut ledger = PostedLedger::empty(&path);
        ledger.add("b");
        ledger.add("a");
        ledger.persist().await.unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["posted_ids"], serde_json::json!(["a", "b"]));
        let stamp = value["last_updated"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[tokio::test]
    async fn reads_ledger_written_elsewhere() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        std::fs::write(
            &path,
            r#"{"posted_ids": ["x", "y"], "last_updated": "2026-01-13 09:00:00"}"#,
        )
        .unwrap();

        let ledger = PostedLedger::load(&path).await.unwrap();
        assert!(ledger.contains("x"));
        assert_eq!(ledger.last_updated(), Some("2026-01-13 09:00:00"));
    }

    #[tokio::test]
    async fn corrupt_ledger_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posted.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            PostedLedger::load(&path).await,
            Err(AppError::Json(_))
        ));
    }
}
