//! Input ingestion
//!
//! Parses loosely structured repository rows (exported from the selection
//! spreadsheets) into strict typed records at the boundary, so downstream
//! code never branches on "does this field exist". Missing values become
//! explicit `None`, never implicit absence.

use crate::models::Repository;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("input is not a JSON array of rows: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("row {index}: missing or invalid repository name {name:?}")]
    BadName { index: usize, name: String },

    #[error("row {index} ({repo}): invalid date in column {column}: {value:?}")]
    BadDate {
        index: usize,
        repo: String,
        column: &'static str,
        value: String,
    },
}

/// One raw input row as it appears in the exported spreadsheet data.
/// Every column is optional here; validation happens in [`RepoSpec::from_row`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRow {
    #[serde(default, alias = "Nome", alias = "nameWithOwner")]
    pub name: Option<String>,
    #[serde(default, alias = "URL")]
    pub url: Option<String>,
    #[serde(default, alias = "Stargazers")]
    pub stars: Option<u64>,
    #[serde(default, alias = "Criado em", alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "Data de morte")]
    pub death_date: Option<String>,
    #[serde(default, alias = "Data de ressurreição")]
    pub revival_date: Option<String>,
    #[serde(default)]
    pub analyzed_commit_count: Option<usize>,
    /// Input category; repositories without a revival date are controls
    #[serde(default)]
    pub category: Option<String>,
}

/// A validated input record for one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoSpec {
    pub repo: Repository,
    /// Previously recorded death date, informational
    pub death_date: Option<DateTime<Utc>>,
    /// Absent for dead (control) repositories
    pub revival_date: Option<DateTime<Utc>>,
    /// Informational commit count from the selection phase
    pub analyzed_commit_count: Option<usize>,
    pub category: String,
}

impl RepoSpec {
    /// Validate one raw row. The name must be `owner/name`; dates must be
    /// `YYYY-MM-DD` when present.
    pub fn from_row(index: usize, row: RawRow) -> Result<Self, InputError> {
        let name = row.name.unwrap_or_default();
        if !name.contains('/') || name.starts_with('/') || name.ends_with('/') {
            return Err(InputError::BadName { index, name });
        }

        let url = row
            .url
            .unwrap_or_else(|| format!("https://github.com/{name}"));

        let created_at = parse_date(index, &name, "created_at", row.created_at)?;
        let death_date = parse_date(index, &name, "death_date", row.death_date)?;
        let revival_date = parse_date(index, &name, "revival_date", row.revival_date)?;

        let category = row.category.unwrap_or_else(|| {
            if revival_date.is_some() {
                "resurrected".to_string()
            } else {
                "control".to_string()
            }
        });

        Ok(RepoSpec {
            repo: Repository {
                full_name: name,
                url,
                stars: row.stars,
                created_at,
            },
            death_date,
            revival_date,
            analyzed_commit_count: row.analyzed_commit_count,
            category,
        })
    }
}

fn parse_date(
    index: usize,
    repo: &str,
    column: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, InputError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| InputError::BadDate {
        index,
        repo: repo.to_string(),
        column,
        value: raw.clone(),
    })?;
    Ok(Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0).expect("midnight is valid"),
        Utc,
    )))
}

/// Load and validate an input file (JSON array of rows).
///
/// Rows that fail validation are logged and skipped; they do not abort
/// the batch. `sources` filters by category priority list.
pub fn load_repo_specs(path: &Path, sources: &[String]) -> Result<Vec<RepoSpec>, InputError> {
    let content = std::fs::read_to_string(path)?;
    let rows: Vec<RawRow> = serde_json::from_str(&content)?;

    let mut specs = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        match RepoSpec::from_row(index, row) {
            Ok(spec) => {
                if sources.iter().any(|s| s == &spec.category) {
                    specs.push(spec);
                }
            }
            Err(e) => warn!("Skipping input row: {e}"),
        }
    }
    Ok(specs)
}
