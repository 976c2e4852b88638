use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::data_dir;
use crate::error::AppError;
use crate::state::item::Item;
use crate::state::tree::ItemTree;

/// On-disk shape of a workspace tree.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TreeFile {
    #[serde(default)]
    items: Vec<Item>,
}

fn workspaces_dir() -> PathBuf {
    data_dir().join("workspaces")
}

/// `<data_dir>/workspaces/<name>`
pub fn workspace_dir(ws_name: &str) -> PathBuf {
    workspaces_dir().join(ws_name)
}

/// `<data_dir>/workspaces/<name>/tree.toml`
pub fn tree_path(ws_name: &str) -> PathBuf {
    workspace_dir(ws_name).join("tree.toml")
}

/// Sorted names of the workspace directories under `root`. A root that does not
/// exist yet only holds the implicit `default` workspace.
pub fn workspaces_in(root: &Path) -> Result<Vec<String>, AppError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(vec!["default".to_string()]);
        }
        Err(err) => return Err(err.into()),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => tracing::warn!(event = "storage.skipped_workspace", name = ?raw, "not valid UTF-8"),
        }
    }
    if names.is_empty() {
        names.push("default".to_string());
    }
    names.sort();
    Ok(names)
}

pub fn list_workspaces() -> Result<Vec<String>, AppError> {
    workspaces_in(&workspaces_dir())
}

/// Load a tree from `path`. A missing file is an empty tree; anything that is
/// not a valid forest is an error.
pub fn load_tree(path: &Path) -> Result<ItemTree, AppError> {
    if !path.exists() {
        return Ok(ItemTree::new());
    }
    let content = std::fs::read_to_string(path)?;
    let file: TreeFile = toml::from_str(&content)?;
    let tree = ItemTree::from_items(file.items)?;
    tracing::debug!(event = "storage.loaded", path = %path.display(), items = tree.len());
    Ok(tree)
}

/// Persist the whole tree to `path`, creating the directory if needed. The file
/// is written next to its destination first and then renamed over it.
pub fn save_tree(path: &Path, tree: &ItemTree) -> Result<(), AppError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = TreeFile { items: tree.items().to_vec() };
    let content = toml::to_string_pretty(&file)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(event = "storage.saved", path = %path.display(), items = tree.len());
    Ok(())
}
