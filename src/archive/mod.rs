//! Raw archive and checkpoints
//!
//! Everything persisted during a run lives under one output root:
//! per-repository raw artifacts (one JSON file per collected source, for
//! audit and replay), pagination cursor checkpoints, and the execution
//! log. Artifacts are keyed by the `owner__name` archive key.

use crate::github::{CheckpointSink, Cursor};
use crate::models::{Repository, RunLogEntry};
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Collected raw sources. Each gets its own artifact file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Commits,
    PullRequests,
    Issues,
}

impl Source {
    fn file_name(&self) -> &'static str {
        match self {
            Source::Commits => "commits.json",
            Source::PullRequests => "pull_requests.json",
            Source::Issues => "issues.json",
        }
    }
}

/// Filesystem layout for one run's outputs.
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    /// Open (creating if needed) an archive under `output_root/archive`.
    pub fn open(output_root: &Path) -> Result<Self> {
        let root = output_root.join("archive");
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create archive directory {}", root.display()))?;
        Ok(Self { root })
    }

    fn repo_dir(&self, repo: &Repository) -> PathBuf {
        self.root.join(repo.archive_key())
    }

    fn cursor_path(&self, repo: &Repository) -> PathBuf {
        self.repo_dir(repo).join("cursor.json")
    }

    /// Persist one raw artifact for a repository.
    pub fn write_source<T: Serialize>(
        &self,
        repo: &Repository,
        source: Source,
        payload: &T,
    ) -> Result<()> {
        let dir = self.repo_dir(repo);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(source.file_name());
        write_json(&path, payload)
    }

    /// Read a raw artifact back, if present.
    pub fn read_source<T: DeserializeOwned>(
        &self,
        repo: &Repository,
        source: Source,
    ) -> Result<Option<T>> {
        read_json(&self.repo_dir(repo).join(source.file_name()))
    }

    /// Load the persisted resume cursor, if any.
    pub fn load_cursor(&self, repo: &Repository) -> Option<Cursor> {
        match read_json::<Cursor>(&self.cursor_path(repo)) {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!("{}: unreadable cursor checkpoint: {e}", repo.full_name);
                None
            }
        }
    }

    /// Drop the cursor checkpoint once a repository's fetch completed.
    pub fn clear_cursor(&self, repo: &Repository) {
        let path = self.cursor_path(repo);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("{}: failed to clear cursor: {e}", repo.full_name);
            }
        }
    }

    /// Write the execution log (one entry per repository per run).
    pub fn write_run_log(&self, output_root: &Path, entries: &[RunLogEntry]) -> Result<()> {
        write_json(&output_root.join("runlog.json"), &entries)
    }
}

impl CheckpointSink for Archive {
    fn save(&self, repo: &Repository, cursor: &Cursor) {
        let dir = self.repo_dir(repo);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("{}: failed to create archive dir: {e}", repo.full_name);
            return;
        }
        if let Err(e) = write_json(&self.cursor_path(repo), cursor) {
            // A lost checkpoint only costs re-fetching; the run goes on.
            warn!("{}: failed to persist cursor: {e}", repo.full_name);
        } else {
            debug!("{}: checkpoint at page {}", repo.full_name, cursor.page);
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Malformed JSON in {}", path.display()))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommitRecord;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn test_repo() -> Repository {
        Repository {
            full_name: "octo/cat".into(),
            url: "https://github.com/octo/cat".into(),
            stars: None,
            created_at: None,
        }
    }

    #[test]
    fn test_source_round_trip() {
        let dir = tempdir().expect("tempdir");
        let archive = Archive::open(dir.path()).expect("open");
        let repo = test_repo();

        let commits = vec![CommitRecord {
            sha: "a".repeat(40),
            author: "dev".into(),
            timestamp: Utc.with_ymd_and_hms(2019, 1, 15, 0, 0, 0).unwrap(),
        }];
        archive
            .write_source(&repo, Source::Commits, &commits)
            .expect("write");

        let loaded: Option<Vec<CommitRecord>> = archive
            .read_source(&repo, Source::Commits)
            .expect("read");
        assert_eq!(loaded, Some(commits));

        // Other sources are absent, not errors.
        let prs: Option<serde_json::Value> = archive
            .read_source(&repo, Source::Issues)
            .expect("read absent");
        assert!(prs.is_none());
    }

    #[test]
    fn test_cursor_checkpoint_lifecycle() {
        let dir = tempdir().expect("tempdir");
        let archive = Archive::open(dir.path()).expect("open");
        let repo = test_repo();

        assert!(archive.load_cursor(&repo).is_none());

        let cursor = Cursor { page: 4, fetched: 300 };
        archive.save(&repo, &cursor);
        assert_eq!(archive.load_cursor(&repo), Some(cursor));

        archive.clear_cursor(&repo);
        assert!(archive.load_cursor(&repo).is_none());
    }

    #[test]
    fn test_artifacts_keyed_by_archive_key() {
        let dir = tempdir().expect("tempdir");
        let archive = Archive::open(dir.path()).expect("open");
        let repo = test_repo();
        archive
            .write_source(&repo, Source::PullRequests, &serde_json::json!([]))
            .expect("write");
        assert!(dir
            .path()
            .join("archive/octo__cat/pull_requests.json")
            .exists());
    }
}
