use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::state::result::{HistoryEntry, ResultHistory};
use crate::storage::workspace::workspace_dir;

/// `<data_dir>/workspaces/<name>/history.json`
pub fn history_path(ws_name: &str) -> PathBuf {
    workspace_dir(ws_name).join("history.json")
}

/// Load the result history at `path`, keeping the newest `capacity` entries. A
/// missing file is an empty history.
pub fn load_history(path: &Path, capacity: usize) -> Result<ResultHistory, AppError> {
    if !path.exists() {
        return Ok(ResultHistory::with_capacity(capacity));
    }
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<HistoryEntry> = serde_json::from_str(&content)?;
    Ok(ResultHistory::from_entries(capacity, entries))
}

pub fn save_history(path: &Path, history: &ResultHistory) -> Result<(), AppError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let entries: Vec<&HistoryEntry> = history.iter().collect();
    std::fs::write(path, serde_json::to_string_pretty(&entries)?)?;
    tracing::debug!(event = "storage.history_saved", path = %path.display(), entries = entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::result::{ExecutionResult, Outcome};
    use uuid::Uuid;

    #[test]
    fn test_missing_history_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = load_history(&dir.path().join("history.json"), 3).unwrap();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn test_reload_trims_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ws").join("history.json");
        let req = Uuid::new_v4();

        let mut history = ResultHistory::with_capacity(10);
        for message in ["one", "two", "three"] {
            history.record(req, ExecutionResult::immediate_failure(message));
        }
        save_history(&path, &history).unwrap();

        assert_eq!(load_history(&path, 10).unwrap(), history);
        let trimmed = load_history(&path, 2).unwrap();
        let kept: Vec<_> = trimmed.for_request(req).map(|r| r.outcome().clone()).collect();
        assert_eq!(kept, vec![Outcome::failure("three"), Outcome::failure("two")]);
    }

    #[test]
    fn test_garbage_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(load_history(&path, 5), Err(AppError::Json(_))));
    }
}
