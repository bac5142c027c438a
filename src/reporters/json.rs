//! JSON reporter
//!
//! Pretty-printed JSON for every on-disk artifact: the features and
//! changes tables, the validation report, and the run log. Useful for
//! machine consumption or piping to jq.

use anyhow::Result;
use serde::Serialize;

use crate::aggregate::validate::ValidationReport;
use crate::models::{DeltaRow, FeatureRow};

pub fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn render_features(rows: &[FeatureRow]) -> Result<String> {
    render(&rows)
}

pub fn render_changes(rows: &[DeltaRow]) -> Result<String> {
    render(&rows)
}

pub fn render_validation(report: &ValidationReport) -> Result<String> {
    render(report)
}
