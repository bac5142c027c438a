//! CSV rendering of the features and changes tables
//!
//! Metric names are identifiers and values render as plain numbers or
//! `NA`, so no general CSV escaping is needed; the repository column is
//! quoted defensively since it is the only externally supplied field.

use std::collections::BTreeSet;

use crate::models::{DeltaRow, FeatureRow, MetricValue};

fn quote_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Column order is fixed identity columns first, then metric columns in
/// sorted order, matching the JSON output.
fn metric_columns(rows: &[FeatureRow]) -> Vec<String> {
    let mut columns = BTreeSet::new();
    for row in rows {
        for name in row.metrics.keys() {
            columns.insert(name.clone());
        }
    }
    columns.into_iter().collect()
}

pub fn render_features(rows: &[FeatureRow]) -> String {
    let columns = metric_columns(rows);
    let mut out = String::new();
    out.push_str("repo,cycle,phase");
    for col in &columns {
        out.push(',');
        out.push_str(col);
    }
    out.push('\n');

    for row in rows {
        out.push_str(&quote_field(&row.repo));
        out.push_str(&format!(",{},{}", row.cycle, row.phase));
        for col in &columns {
            out.push(',');
            let value = row.metrics.get(col).unwrap_or(&MetricValue::Na);
            out.push_str(&value.to_string());
        }
        out.push('\n');
    }
    out
}

pub fn render_changes(rows: &[DeltaRow]) -> String {
    let mut columns = BTreeSet::new();
    for row in rows {
        for name in row.deltas.keys() {
            columns.insert(name.clone());
        }
    }
    let columns: Vec<String> = columns.into_iter().collect();

    let mut out = String::new();
    out.push_str("repo,cycle");
    for col in &columns {
        out.push_str(&format!(",{col}_delta,{col}_percent_change"));
    }
    out.push('\n');

    for row in rows {
        out.push_str(&quote_field(&row.repo));
        out.push_str(&format!(",{}", row.cycle));
        for col in &columns {
            match row.deltas.get(col) {
                Some(d) => {
                    out.push_str(&format!(",{},{}", d.delta, d.percent_change));
                }
                None => out.push_str(",NA,NA"),
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::{test_deltas, test_features};

    #[test]
    fn test_features_header_and_na_cells() {
        let csv = render_features(&test_features());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("repo,cycle,phase,commits_count,issues_open"));
        assert_eq!(lines.next(), Some("octo/cat,0,pre,12,NA"));
        assert_eq!(lines.next(), Some("octo/cat,0,post,5,3"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_changes_pairs_delta_and_percent_columns() {
        let csv = render_changes(&test_deltas());
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("repo,cycle,commits_count_delta,commits_count_percent_change,issues_open_delta,issues_open_percent_change")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("octo/cat,0,-7,"));
        assert!(row.ends_with(",NA,NA"));
    }

    #[test]
    fn test_repo_with_comma_is_quoted() {
        let mut rows = test_features();
        rows[0].repo = "weird,name/repo".into();
        let csv = render_features(&rows);
        assert!(csv.contains("\"weird,name/repo\",0,pre"));
    }

    #[test]
    fn test_empty_tables_render_headers_only() {
        assert_eq!(render_features(&[]), "repo,cycle,phase\n");
        assert_eq!(render_changes(&[]), "repo,cycle\n");
    }
}
