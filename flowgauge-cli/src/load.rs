//! Corpus loading
//!
//! Evaluation corpora are directories of `workflow_<ts>_<run>.json` and
//! `execution_<ts>_<run>.json` files. Files load in run-id order so batch
//! indices are stable across invocations, and a file that fails to parse is
//! skipped with a warning rather than aborting the whole batch.

use anyhow::Result;
use flowgauge_core::prelude::{ExecutionState, Workflow};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Files under `dir` named `<prefix>*.json`, sorted by the trailing integer
/// run id in the stem (lexically when no run id is present).
pub fn sorted_corpus_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().and_then(|e| e.to_str()) == Some("json")
                && path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.starts_with(prefix))
        })
        .collect();

    files.sort_by_key(|path| (run_id(path), path.clone()));
    Ok(files)
}

fn run_id(path: &Path) -> Option<u64> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit('_').next())
        .and_then(|tail| tail.parse().ok())
}

/// Load every workflow in run-id order, skipping unparseable files.
pub fn load_workflows(dir: &Path) -> Result<Vec<(String, Workflow)>> {
    let mut workflows = Vec::new();
    for path in sorted_corpus_files(dir, "workflow")? {
        match Workflow::load(&path) {
            Ok(workflow) => workflows.push((display_name(&path), workflow)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unparseable workflow"),
        }
    }
    Ok(workflows)
}

/// Load every execution record in run-id order, skipping unparseable files.
pub fn load_executions(dir: &Path) -> Result<Vec<(String, ExecutionState)>> {
    let mut executions = Vec::new();
    for path in sorted_corpus_files(dir, "execution")? {
        match ExecutionState::load(&path) {
            Ok(execution) => executions.push((display_name(&path), execution)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unparseable execution"),
        }
    }
    Ok(executions)
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_sorted_by_run_id_not_lexically() {
        let dir = tempfile::tempdir().unwrap();
        for run in [10, 2, 1] {
            std::fs::write(
                dir.path().join(format!("workflow_20250101_{run}.json")),
                "{}",
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("execution_20250101_1.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = sorted_corpus_files(dir.path(), "workflow").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "workflow_20250101_1.json",
                "workflow_20250101_2.json",
                "workflow_20250101_10.json"
            ]
        );
    }

    #[test]
    fn test_bad_workflow_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("workflow_1.json"), "not json at all").unwrap();
        std::fs::write(
            dir.path().join("workflow_2.json"),
            r#"{
                "title": "t", "description": "d", "target_objective": "o",
                "metadata": { "original_prompt": "p" },
                "steps": [ { "id": 1, "is_final": true } ]
            }"#,
        )
        .unwrap();

        let workflows = load_workflows(dir.path()).unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].0, "workflow_2");
    }
}
