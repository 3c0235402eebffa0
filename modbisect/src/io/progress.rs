//! Progress snapshot storage for resuming a search across invocations.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

const PROGRESS_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/progress/v1.schema.json"
));

/// Persisted projection of the search engine state (`progress.json`).
///
/// Field names are camelCase on disk. Missing fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchProgress {
    /// Number of splits performed so far.
    pub iteration: u32,
    pub suspects: Vec<String>,
    pub innocent: Vec<String>,
    pub currently_disabled: Vec<String>,
    /// Ids enabled when the search started.
    pub all_ids: Vec<String>,
    /// Mods directory the search runs against.
    pub store_location: String,
    /// RFC 3339 time the snapshot was taken.
    pub timestamp: String,
    /// True while the search awaits a verdict.
    pub is_active: bool,
}

/// Load a progress snapshot. Returns `None` when no snapshot exists.
pub fn load_progress(path: &Path) -> Result<Option<SearchProgress>> {
    if !path.exists() {
        debug!(path = %path.display(), "no progress file");
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read progress {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse progress {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("validate progress {}", path.display()))?;
    let progress: SearchProgress = serde_json::from_value(value)
        .with_context(|| format!("deserialize progress {}", path.display()))?;
    info!(path = %path.display(), iteration = progress.iteration, "progress loaded");
    Ok(Some(progress))
}

/// Atomically write a progress snapshot (temp file + rename).
pub fn write_progress(path: &Path, progress: &SearchProgress) -> Result<()> {
    debug!(
        path = %path.display(),
        iteration = progress.iteration,
        active = progress.is_active,
        "writing progress"
    );
    let mut buf = serde_json::to_string_pretty(progress)?;
    buf.push('\n');
    write_atomic(path, &buf)?;
    info!(path = %path.display(), "progress saved");
    Ok(())
}

/// Remove the snapshot if present.
pub fn clear_progress(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("remove progress {}", path.display()))?;
        info!(path = %path.display(), "progress cleared");
    }
    Ok(())
}

fn validate_schema(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(PROGRESS_SCHEMA).context("parse progress schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(value) {
        let messages = compiled
            .iter_errors(value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "progress schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("progress path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp progress {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace progress {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SearchProgress {
        SearchProgress {
            iteration: 2,
            suspects: vec!["a".to_string()],
            innocent: vec!["c".to_string(), "d".to_string()],
            currently_disabled: vec!["a".to_string()],
            all_ids: vec!["a", "b", "c", "d"].into_iter().map(String::from).collect(),
            store_location: "/srv/mods".to_string(),
            timestamp: "2024-05-01T10:00:00+00:00".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn progress_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state").join("progress.json");
        let progress = sample();

        write_progress(&path, &progress).expect("write");
        let loaded = load_progress(&path).expect("load").expect("present");
        assert_eq!(loaded, progress);
        assert!(loaded.is_active);
    }

    #[test]
    fn uses_camel_case_field_names() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert!(json.get("currentlyDisabled").is_some());
        assert!(json.get("allIds").is_some());
        assert!(json.get("storeLocation").is_some());
        assert!(json.get("isActive").is_some());
    }

    #[test]
    fn missing_fields_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("progress.json");
        fs::write(&path, "{\"iteration\": 3}").expect("write");
        let loaded = load_progress(&path).expect("load").expect("present");
        assert_eq!(loaded.iteration, 3);
        assert!(loaded.suspects.is_empty());
        assert!(!loaded.is_active);
    }

    #[test]
    fn schema_rejects_wrong_types() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("progress.json");
        fs::write(&path, "{\"iteration\": -1, \"suspects\": \"a\"}").expect("write");
        let err = load_progress(&path).unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn missing_file_loads_as_none_and_clear_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("progress.json");
        assert!(load_progress(&path).expect("load").is_none());
        clear_progress(&path).expect("clear missing");

        write_progress(&path, &sample()).expect("write");
        clear_progress(&path).expect("clear");
        assert!(!path.exists());
    }
}
