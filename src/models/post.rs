//! In-flight post state.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AnimalRecord, PostVariant};

/// Processing state of a media container on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Error,
    Expired,
    Published,
    Other(String),
}

impl ContainerStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "IN_PROGRESS" => ContainerStatus::InProgress,
            "FINISHED" => ContainerStatus::Finished,
            "ERROR" => ContainerStatus::Error,
            "EXPIRED" => ContainerStatus::Expired,
            "PUBLISHED" => ContainerStatus::Published,
            other => ContainerStatus::Other(other.to_string()),
        }
    }

    /// Terminal failure states.
    pub fn is_failure(&self) -> bool {
        matches!(self, ContainerStatus::Error | ContainerStatus::Expired)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::InProgress => f.write_str("IN_PROGRESS"),
            ContainerStatus::Finished => f.write_str("FINISHED"),
            ContainerStatus::Error => f.write_str("ERROR"),
            ContainerStatus::Expired => f.write_str("EXPIRED"),
            ContainerStatus::Published => f.write_str("PUBLISHED"),
            ContainerStatus::Other(code) => f.write_str(code),
        }
    }
}

/// A staged media item on the platform.
#[derive(Debug, Clone)]
pub struct MediaContainer {
    pub id: String,
    pub status: ContainerStatus,
}

/// Result of a confirmed publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMedia {
    /// Public media id returned by `media_publish`
    pub media_id: String,

    /// Container that was published (carousel parent or single image)
    pub container_id: String,

    /// Image URLs that made it into the post
    pub published_urls: Vec<String>,
}

/// One selected record and the artifacts produced for it so far.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub record: AnimalRecord,
    pub image_path: Option<PathBuf>,
    pub image_url: Option<String>,
}

/// Working set of a single run.
#[derive(Debug, Clone)]
pub struct PostBatch {
    pub variant: PostVariant,
    pub target_date: NaiveDate,
    pub entries: Vec<BatchEntry>,
}

impl PostBatch {
    pub fn new(variant: PostVariant, target_date: NaiveDate, records: Vec<AnimalRecord>) -> Self {
        Self {
            variant,
            target_date,
            entries: records
                .into_iter()
                .map(|record| BatchEntry {
                    record,
                    image_path: None,
                    image_url: None,
                })
                .collect(),
        }
    }

    /// Entries that were rendered.
    pub fn rendered(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|e| e.image_path.is_some())
    }

    /// Entries that were rendered and uploaded.
    pub fn uploaded(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|e| e.image_url.is_some())
    }

    pub fn rendered_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|e| e.image_path.clone())
            .collect()
    }

    pub fn uploaded_urls(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| e.image_url.clone())
            .collect()
    }

    fn with_urls<'b>(&'b self, urls: &'b [String]) -> impl Iterator<Item = &'b BatchEntry> {
        self.entries
            .iter()
            .filter(|e| e.image_url.as_ref().is_some_and(|u| urls.contains(u)))
    }

    /// Records whose uploaded image is one of `urls`.
    pub fn records_for_urls(&self, urls: &[String]) -> Vec<AnimalRecord> {
        self.with_urls(urls).map(|e| e.record.clone()).collect()
    }

    /// Ledger ids of the records whose image is one of `urls`.
    pub fn ids_for_urls(&self, urls: &[String]) -> Vec<String> {
        self.with_urls(urls).map(|e| e.record.id.clone()).collect()
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Posted to the platform
    Published { media_id: String },
    /// Every stage ran except publishing
    DryRun { urls: Vec<String> },
    /// No eligible animals for the date
    NothingToPost,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub fetched: usize,
    pub selected: usize,
    pub rendered: usize,
    pub uploaded: usize,
    pub ledger_added: Vec<String>,
}

impl RunReport {
    pub fn nothing_to_post(fetched: usize) -> Self {
        Self {
            outcome: RunOutcome::NothingToPost,
            fetched,
            selected: 0,
            rendered: 0,
            uploaded: 0,
            ledger_added: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip_through_display() {
        for code in ["IN_PROGRESS", "FINISHED", "ERROR", "EXPIRED", "PUBLISHED"] {
            assert_eq!(ContainerStatus::from_code(code).to_string(), code);
        }
        assert!(ContainerStatus::from_code("ERROR").is_failure());
        assert!(ContainerStatus::from_code("EXPIRED").is_failure());
        assert!(!ContainerStatus::from_code("IN_PROGRESS").is_failure());
    }
}
