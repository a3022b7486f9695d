// Loading a real directory into a fresh workspace. This is the only place the
// crate reads project files from disk.

use std::path::Path;
use tracing::instrument;

use crate::config::PlaygroundConfig;
use crate::errors::{ErrorType, PlaygroundError, Result};
use crate::vfs::{NodeId, NodeType, Workspace};

/// Copies every file under `dir` into a new workspace rooted at
/// `config.root_name`. Files that are not valid UTF-8 are skipped. The entry
/// file, when present at the top level, is opened as the active tab.
#[instrument(skip(config))]
pub fn load_directory(dir: &Path, config: &PlaygroundConfig) -> Result<Workspace> {
    if !dir.is_dir() {
        return Err(PlaygroundError::new(
            ErrorType::NotFound,
            format!("{} is not a directory", dir.display()),
        ));
    }
    let mut workspace = Workspace::new(&PlaygroundConfig {
        seed: false,
        ..config.clone()
    })?;
    let root = workspace.root_id();
    let loaded = load_entries(&mut workspace, root, dir)?;

    let entry_path = format!("{}/{}", workspace.tree().root().path, config.entry_file);
    if let Some(id) = workspace.node_at(&entry_path).map(|n| n.id) {
        workspace.open_file(id)?;
    }
    tracing::info!("Loaded {} files from {}", loaded, dir.display());
    Ok(workspace)
}

fn load_entries(workspace: &mut Workspace, parent: NodeId, dir: &Path) -> Result<usize> {
    let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut loaded = 0;
    for entry in entries {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                tracing::warn!("Skipping {:?}: name is not valid UTF-8", name);
                continue;
            }
        };
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let folder = workspace.create_node(parent, &name, NodeType::Folder)?;
            loaded += load_entries(workspace, folder, &path)?;
        } else if file_type.is_file() {
            match String::from_utf8(std::fs::read(&path)?) {
                Ok(content) => {
                    workspace.import_file(parent, &name, &content)?;
                    loaded += 1;
                }
                Err(_) => tracing::warn!("Skipping {}: not a text file", path.display()),
            }
        }
    }
    Ok(loaded)
}
