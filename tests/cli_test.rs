//! CLI contract tests
//!
//! Drives the compiled binary end to end over the offline commands:
//! init, aggregate, validate, and the mine preconditions that fail
//! before any network call.

use std::path::Path;
use std::process::Command;

fn lazarus_bin() -> &'static str {
    env!("CARGO_BIN_EXE_lazarus")
}

fn run_in(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(lazarus_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .expect("binary runs")
}

const MINING_JSON: &str = r#"[
  {
    "repo": {
      "full_name": "octo/cat",
      "url": "https://github.com/octo/cat"
    },
    "category": "resurrected",
    "cycles": [
      {
        "index": 0,
        "death": {
          "cycle": 0,
          "start_commit": {
            "sha": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "author": "dev",
            "timestamp": "2019-01-15T00:00:00Z"
          },
          "gap_days": 584
        },
        "revival": {
          "sha": "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
          "author": "dev",
          "timestamp": "2021-03-10T00:00:00Z"
        }
      }
    ],
    "snapshots": [
      {
        "repo": "octo/cat",
        "cycle": 0,
        "phase": "pre",
        "sha": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "timestamp": "2019-01-15T00:00:00Z"
      },
      {
        "repo": "octo/cat",
        "cycle": 0,
        "phase": "post",
        "sha": "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
        "timestamp": "2021-03-10T00:00:00Z"
      }
    ],
    "commit_count": 4,
    "pages_fetched": 1,
    "page_size": 100,
    "status": { "status": "complete" }
  }
]"#;

const COLLECTOR_JSON: &str = r#"{
  "collector": "commit_activity",
  "rows": [
    { "repo": "octo/cat", "cycle": 0, "phase": "pre",
      "metrics": { "commits_count": 12.0 } },
    { "repo": "octo/cat", "cycle": 0, "phase": "post",
      "metrics": { "commits_count": 5.0 } }
  ]
}"#;

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["version"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("lazarus "));
}

#[test]
fn test_init_writes_config() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(dir.path(), &["init"]);
    assert!(out.status.success());
    let config = std::fs::read_to_string(dir.path().join("lazarus.toml")).unwrap();
    assert!(config.contains("gap_threshold_days = 180"));

    // Second init must leave the file alone
    let out = run_in(dir.path(), &["init"]);
    assert!(out.status.success());
}

#[test]
fn test_mine_without_token_fails_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("repos.json"),
        r#"[{"nameWithOwner": "octo/cat", "URL": "https://github.com/octo/cat",
             "Data de ressurreição": "2021-03-10"}]"#,
    )
    .unwrap();

    let out = run_in(dir.path(), &["mine", "repos.json", "-o", "out"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("GITHUB_TOKEN"), "stderr: {stderr}");
}

#[test]
fn test_mine_rejects_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("repos.json"), "[]").unwrap();

    let out = run_in(dir.path(), &["mine", "repos.json", "-o", "out"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("No repositories matched"), "stderr: {stderr}");
}

#[test]
fn test_aggregate_then_validate_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let coll_dir = dir.path().join("metrics");
    std::fs::create_dir_all(&out_dir).unwrap();
    std::fs::create_dir_all(&coll_dir).unwrap();
    std::fs::write(out_dir.join("mining.json"), MINING_JSON).unwrap();
    std::fs::write(coll_dir.join("commit_activity.json"), COLLECTOR_JSON).unwrap();

    let out = run_in(
        dir.path(),
        &["aggregate", "-o", "out", "--collectors", "metrics"],
    );
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let features = std::fs::read_to_string(out_dir.join("features.csv")).unwrap();
    assert!(features.contains("repo,cycle,phase,commits_count"));
    assert!(features.contains("octo/cat,0,pre,12"));

    let changes = std::fs::read_to_string(out_dir.join("changes.csv")).unwrap();
    assert!(changes.contains("commits_count_delta"));
    assert!(changes.contains("octo/cat,0,-7,"));

    let out = run_in(dir.path(), &["validate", "-o", "out"]);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let report = std::fs::read_to_string(out_dir.join("validation.json")).unwrap();
    assert!(report.contains("\"temporal_ordering\": true"));
}

#[test]
fn test_validate_without_mining_results_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let out = run_in(dir.path(), &["validate", "-o", "out"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("mining.json"), "stderr: {stderr}");
}
