use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use crate::config::PlaygroundConfig;
use crate::errors::{ErrorType, PlaygroundError, Result};
use crate::vfs::index::FileIndex;
use crate::vfs::node::{child_path, is_valid_name, Language, NodeId, NodeType, VirtualNode};
use crate::vfs::templates::{default_content, SEED_INDEX_HTML, SEED_SCRIPT_JS, SEED_STYLE_CSS};
use crate::vfs::tree::{FileTree, VisibleNode};

/// Tab bar projection of an open file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    pub language: Language,
    pub is_dirty: bool,
}

/// What the editor widget needs to show the active file. The widget keys its
/// cursor and scroll state by `file_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorBinding {
    pub value: String,
    pub language: Language,
    pub file_id: NodeId,
}

/// The HTML document that drives the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSource {
    pub file_id: NodeId,
    pub path: String,
    pub content: String,
}

impl PreviewSource {
    fn from_node(node: &VirtualNode) -> PreviewSource {
        PreviewSource {
            file_id: node.id,
            path: node.path.clone(),
            content: node.content().unwrap_or_default().to_string(),
        }
    }
}

/// Session store for the playground: the current tree snapshot, its flat
/// index, the open tabs and the active file.
///
/// Every mutation builds a new [`FileTree`] snapshot and publishes it only when
/// the operation succeeds, so a failed call leaves everything as it was and
/// holders of an older `Arc<FileTree>` never see a partial update.
pub struct Workspace {
    tree: Arc<FileTree>,
    index: Arc<FileIndex>,
    open_files: Vec<NodeId>,
    active_file: Option<NodeId>,
    entry_file: String,
}

impl Workspace {
    /// Builds the workspace described by the configuration.
    pub fn new(config: &PlaygroundConfig) -> Result<Workspace> {
        let mut workspace = Workspace::empty(&config.root_name)?;
        workspace.entry_file = config.entry_file.clone();
        if config.seed {
            workspace.seed()?;
        }
        Ok(workspace)
    }

    /// A workspace whose tree is only an empty root folder.
    pub fn empty(root_name: &str) -> Result<Workspace> {
        if !is_valid_name(root_name) {
            return Err(PlaygroundError::new(
                ErrorType::InvalidName,
                format!("'{}' is not a valid root folder name", root_name),
            ));
        }
        let tree = FileTree::new(root_name);
        let index = FileIndex::from_tree(&tree);
        Ok(Workspace {
            tree: Arc::new(tree),
            index: Arc::new(index),
            open_files: Vec::new(),
            active_file: None,
            entry_file: "index.html".to_string(),
        })
    }

    /// A workspace holding the starter `index.html`, `style.css` and `script.js`.
    pub fn seeded(root_name: &str) -> Result<Workspace> {
        let mut workspace = Workspace::empty(root_name)?;
        workspace.seed()?;
        Ok(workspace)
    }

    fn seed(&mut self) -> Result<()> {
        let root = self.tree.root_id();
        let index = self.import_file(root, "index.html", SEED_INDEX_HTML)?;
        self.import_file(root, "style.css", SEED_STYLE_CSS)?;
        self.import_file(root, "script.js", SEED_SCRIPT_JS)?;
        self.open_file(index)?;
        tracing::debug!("Seeded workspace {}", self.tree.root().path);
        Ok(())
    }

    fn commit<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut FileTree) -> Result<T>,
    {
        let mut next = (*self.tree).clone();
        let out = op(&mut next)?;
        self.index = Arc::new(FileIndex::from_tree(&next));
        self.tree = Arc::new(next);
        Ok(out)
    }

    /// Current tree snapshot. Compare with `Arc::ptr_eq` to detect changes.
    pub fn tree(&self) -> Arc<FileTree> {
        self.tree.clone()
    }

    pub fn root_id(&self) -> NodeId {
        self.tree.root_id()
    }

    /// Flat index of the current snapshot, rebuilt on every tree change.
    pub fn flatten_all(&self) -> Arc<FileIndex> {
        self.index.clone()
    }

    pub fn node(&self, id: NodeId) -> Option<&VirtualNode> {
        self.index.get(id)
    }

    pub fn node_at(&self, path: &str) -> Option<&VirtualNode> {
        self.index.at_path(path)
    }

    pub fn open_files(&self) -> &[NodeId] {
        &self.open_files
    }

    pub fn active_file_id(&self) -> Option<NodeId> {
        self.active_file
    }

    pub fn active_file(&self) -> Option<&VirtualNode> {
        self.active_file.and_then(|id| self.index.get(id))
    }

    pub fn visible_nodes(&self) -> Vec<VisibleNode> {
        self.tree.visible_nodes()
    }

    fn require_file(&self, id: NodeId) -> Result<&VirtualNode> {
        let node = self
            .index
            .get(id)
            .ok_or_else(|| PlaygroundError::not_found("File", id))?;
        if !node.is_file() {
            return Err(PlaygroundError::new(
                ErrorType::NotAFile,
                format!("{} is a folder", node.path),
            ));
        }
        Ok(node)
    }

    /// Creates a file or folder under `parent_id`. New files receive the
    /// template for their language and become the active tab.
    #[instrument(skip(self))]
    pub fn create_node(&mut self, parent_id: NodeId, name: &str, node_type: NodeType) -> Result<NodeId> {
        let id = match node_type {
            NodeType::File => {
                let content = default_content(Language::from_file_name(name));
                let id = self.commit(|tree| {
                    tree.insert_with(parent_id, name, |p| {
                        VirtualNode::new_file(name, p, content.to_string())
                    })
                })?;
                self.open_file(id)?;
                id
            }
            NodeType::Folder => self.commit(|tree| {
                tree.insert_with(parent_id, name, |p| VirtualNode::new_folder(name, Some(p)))
            })?,
        };
        if let Some(node) = self.node(id) {
            tracing::info!("Created {:?} {}", node_type, node.path);
        }
        Ok(id)
    }

    /// Adds a file with the given content without opening it or marking it dirty.
    pub fn import_file(&mut self, parent_id: NodeId, name: &str, content: &str) -> Result<NodeId> {
        self.commit(|tree| {
            tree.insert_with(parent_id, name, |p| {
                VirtualNode::new_file(name, p, content.to_string())
            })
        })
    }

    /// Removes a node and its subtree, closing any tab that showed one of the
    /// removed files.
    #[instrument(skip(self))]
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        let removed = self.commit(|tree| tree.remove(id))?;
        for gone in &removed {
            self.close_file(*gone)?;
        }
        tracing::info!("Deleted {} node(s)", removed.len());
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn rename_node(&mut self, id: NodeId, new_name: &str) -> Result<()> {
        let node = self.node(id).ok_or_else(|| PlaygroundError::not_found("Node", id))?;
        if node.name == new_name {
            return Ok(());
        }
        self.commit(|tree| tree.rename(id, new_name))
    }

    /// Flips a folder between expanded and collapsed. Files are ignored.
    pub fn toggle_folder_expansion(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id).ok_or_else(|| PlaygroundError::not_found("Node", id))?;
        if !node.is_folder() {
            return Ok(());
        }
        self.commit(|tree| tree.toggle_expansion(id))?;
        Ok(())
    }

    /// Moves a node into `target_folder_id`. With `target_index` the node is
    /// inserted at that position among the folder's children.
    #[instrument(skip(self))]
    pub fn move_node(&mut self, id: NodeId, target_folder_id: NodeId, target_index: Option<usize>) -> Result<()> {
        self.commit(|tree| tree.move_node(id, target_folder_id, target_index))
    }

    /// Replaces a file's content and marks it dirty.
    #[instrument(level = "debug", skip(self, content), fields(len = content.len()))]
    pub fn update_content(&mut self, file_id: NodeId, content: &str) -> Result<()> {
        self.commit(|tree| tree.set_content(file_id, content))
    }

    /// Opens a tab for the file (if not open yet) and activates it.
    pub fn open_file(&mut self, id: NodeId) -> Result<()> {
        let already_open = self.require_file(id)?.is_open();
        if !self.open_files.contains(&id) {
            self.open_files.push(id);
        }
        if !already_open {
            self.commit(|tree| tree.set_open(id, true))?;
        }
        self.active_file = Some(id);
        Ok(())
    }

    /// Closes a tab. When it was the active one, the tab before it becomes
    /// active, or the first remaining tab, or nothing.
    pub fn close_file(&mut self, id: NodeId) -> Result<()> {
        let position = match self.open_files.iter().position(|f| *f == id) {
            Some(p) => p,
            None => return Ok(()),
        };
        self.open_files.remove(position);
        if self.active_file == Some(id) {
            self.active_file = if self.open_files.is_empty() {
                None
            } else {
                Some(self.open_files[position.saturating_sub(1)])
            };
        }
        if self.tree.contains(id) {
            self.commit(|tree| tree.set_open(id, false))?;
        }
        Ok(())
    }

    /// Makes a file the active one, opening a tab for it if needed.
    pub fn set_active_file(&mut self, id: NodeId) -> Result<()> {
        self.require_file(id)?;
        if self.open_files.contains(&id) {
            self.active_file = Some(id);
            Ok(())
        } else {
            self.open_file(id)
        }
    }

    pub fn tabs(&self) -> Vec<TabInfo> {
        self.open_files
            .iter()
            .filter_map(|id| self.index.get(*id))
            .filter_map(|node| {
                let file = node.as_file()?;
                Some(TabInfo {
                    id: node.id,
                    name: node.name.clone(),
                    path: node.path.clone(),
                    language: file.language,
                    is_dirty: file.is_dirty,
                })
            })
            .collect()
    }

    pub fn editor_binding(&self) -> Option<EditorBinding> {
        let node = self.active_file()?;
        let file = node.as_file()?;
        Some(EditorBinding {
            value: file.content.clone(),
            language: file.language,
            file_id: node.id,
        })
    }

    /// Content of a file, or an empty string for unknown ids and folders.
    pub fn file_content(&self, id: NodeId) -> &str {
        self.index.get(id).and_then(|n| n.content()).unwrap_or_default()
    }

    /// Every HTML file keyed by absolute path.
    pub fn html_files(&self) -> BTreeMap<String, String> {
        self.tree
            .walk()
            .into_iter()
            .filter(|v| v.node.language() == Some(Language::Html))
            .map(|v| (v.node.path.clone(), v.node.content().unwrap_or_default().to_string()))
            .collect()
    }

    /// The HTML document to preview: the active file when it is HTML, else
    /// the entry file at the root, else the first HTML file in tree order.
    pub fn preview_source(&self) -> Option<PreviewSource> {
        if let Some(active) = self.active_file() {
            if active.language() == Some(Language::Html) {
                return Some(PreviewSource::from_node(active));
            }
        }
        let entry_path = child_path(&self.tree.root().path, &self.entry_file);
        if let Some(entry) = self.index.file_at(&entry_path) {
            if entry.language() == Some(Language::Html) {
                return Some(PreviewSource::from_node(entry));
            }
        }
        self.tree
            .walk()
            .into_iter()
            .find(|v| v.node.language() == Some(Language::Html))
            .map(|v| PreviewSource::from_node(&v.node))
    }

    pub fn preview_content(&self) -> String {
        self.preview_source().map(|s| s.content).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::empty("site").unwrap()
    }

    #[test]
    fn seeded_workspace_opens_index() {
        let ws = Workspace::seeded("PLAYBOX").unwrap();
        let active = ws.active_file().unwrap();
        assert_eq!(active.path, "/PLAYBOX/index.html");
        assert!(active.is_open());
        assert!(!active.is_dirty());
        assert!(ws.node_at("/PLAYBOX/style.css").is_some());
        assert!(ws.node_at("/PLAYBOX/script.js").is_some());
        assert_eq!(ws.tabs().len(), 1);
    }

    #[test]
    fn create_file_seeds_template_and_activates() {
        let mut ws = workspace();
        let root = ws.root_id();
        let id = ws.create_node(root, "main.css", NodeType::File).unwrap();
        let node = ws.node(id).unwrap();
        assert_eq!(node.language(), Some(Language::Css));
        assert_eq!(node.content(), Some(default_content(Language::Css)));
        assert!(node.is_open());
        assert!(!node.is_dirty());
        assert_eq!(ws.active_file_id(), Some(id));
        assert_eq!(ws.open_files(), &[id]);
    }

    #[test]
    fn create_folder_is_collapsed_and_not_opened() {
        let mut ws = workspace();
        let root = ws.root_id();
        let id = ws.create_node(root, "lib", NodeType::Folder).unwrap();
        let node = ws.node(id).unwrap();
        assert!(node.is_folder());
        assert!(!node.is_expanded());
        assert!(node.children().is_empty());
        assert!(ws.open_files().is_empty());
        assert_eq!(ws.active_file_id(), None);
    }

    #[test]
    fn create_under_file_fails_without_change() {
        let mut ws = workspace();
        let root = ws.root_id();
        let file = ws.create_node(root, "a.js", NodeType::File).unwrap();
        let before = ws.tree();
        let err = ws.create_node(file, "b.js", NodeType::File).unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotAFolder);
        assert!(Arc::ptr_eq(&before, &ws.tree()));
    }

    #[test]
    fn update_content_marks_dirty_and_publishes_new_snapshot() {
        let mut ws = workspace();
        let root = ws.root_id();
        let file = ws.create_node(root, "a.js", NodeType::File).unwrap();
        let before = ws.tree();
        ws.update_content(file, "let x = 1;").unwrap();
        assert!(!Arc::ptr_eq(&before, &ws.tree()));
        assert_eq!(ws.file_content(file), "let x = 1;");
        assert!(ws.node(file).unwrap().is_dirty());
        assert!(!before.get(file).unwrap().is_dirty());
        assert!(ws.tabs()[0].is_dirty);

        let folder = ws.create_node(root, "dir", NodeType::Folder).unwrap();
        let err = ws.update_content(folder, "nope").unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotAFile);
    }

    #[test]
    fn rename_recomputes_language() {
        let mut ws = workspace();
        let root = ws.root_id();
        let file = ws.create_node(root, "a.js", NodeType::File).unwrap();
        assert_eq!(ws.node(file).unwrap().language(), Some(Language::JavaScript));
        ws.rename_node(file, "a.ts").unwrap();
        let node = ws.node(file).unwrap();
        assert_eq!(node.language(), Some(Language::TypeScript));
        assert_eq!(node.path, "/site/a.ts");
        assert_eq!(ws.tabs()[0].language, Language::TypeScript);
    }

    #[test]
    fn closing_active_tab_selects_previous() {
        let mut ws = workspace();
        let root = ws.root_id();
        let a = ws.create_node(root, "a.js", NodeType::File).unwrap();
        let b = ws.create_node(root, "b.js", NodeType::File).unwrap();
        let c = ws.create_node(root, "c.js", NodeType::File).unwrap();
        ws.set_active_file(b).unwrap();
        ws.close_file(b).unwrap();
        assert_eq!(ws.active_file_id(), Some(a));
        assert!(!ws.node(b).unwrap().is_open());
        ws.close_file(a).unwrap();
        assert_eq!(ws.active_file_id(), Some(c));
        ws.close_file(c).unwrap();
        assert_eq!(ws.active_file_id(), None);
        assert!(ws.tabs().is_empty());
    }

    #[test]
    fn closing_inactive_tab_keeps_active() {
        let mut ws = workspace();
        let root = ws.root_id();
        let a = ws.create_node(root, "a.js", NodeType::File).unwrap();
        let b = ws.create_node(root, "b.js", NodeType::File).unwrap();
        ws.close_file(a).unwrap();
        assert_eq!(ws.active_file_id(), Some(b));
        ws.close_file(a).unwrap();
        assert_eq!(ws.open_files(), &[b]);
    }

    #[test]
    fn deleting_open_file_closes_tab() {
        let mut ws = workspace();
        let root = ws.root_id();
        let a = ws.create_node(root, "a.js", NodeType::File).unwrap();
        let b = ws.create_node(root, "b.js", NodeType::File).unwrap();
        ws.delete_node(b).unwrap();
        assert!(ws.node(b).is_none());
        assert_eq!(ws.open_files(), &[a]);
        assert_eq!(ws.active_file_id(), Some(a));
    }

    #[test]
    fn deleting_folder_closes_files_inside() {
        let mut ws = workspace();
        let root = ws.root_id();
        let keep = ws.create_node(root, "keep.js", NodeType::File).unwrap();
        let dir = ws.create_node(root, "dir", NodeType::Folder).unwrap();
        let inner = ws.create_node(dir, "inner.js", NodeType::File).unwrap();
        assert_eq!(ws.active_file_id(), Some(inner));
        ws.delete_node(dir).unwrap();
        assert!(ws.node(inner).is_none());
        assert_eq!(ws.open_files(), &[keep]);
        assert_eq!(ws.active_file_id(), Some(keep));
    }

    #[test]
    fn delete_root_is_refused() {
        let mut ws = workspace();
        let root = ws.root_id();
        assert_eq!(ws.delete_node(root).unwrap_err().error_type, ErrorType::NotPermitted);
    }

    #[test]
    fn toggle_ignores_files() {
        let mut ws = workspace();
        let root = ws.root_id();
        let dir = ws.create_node(root, "dir", NodeType::Folder).unwrap();
        let file = ws.create_node(root, "a.js", NodeType::File).unwrap();
        ws.toggle_folder_expansion(dir).unwrap();
        assert!(ws.node(dir).unwrap().is_expanded());
        let before = ws.tree();
        ws.toggle_folder_expansion(file).unwrap();
        assert!(Arc::ptr_eq(&before, &ws.tree()));
    }

    #[test]
    fn preview_source_prefers_active_html() {
        let mut ws = Workspace::seeded("PLAYBOX").unwrap();
        let root = ws.root_id();
        let about = ws.create_node(root, "about.html", NodeType::File).unwrap();
        assert_eq!(ws.preview_source().unwrap().file_id, about);

        let css = ws.node_at("/PLAYBOX/style.css").unwrap().id;
        ws.set_active_file(css).unwrap();
        assert_eq!(ws.preview_source().unwrap().path, "/PLAYBOX/index.html");
    }

    #[test]
    fn preview_source_falls_back_to_first_html() {
        let mut ws = workspace();
        let root = ws.root_id();
        assert_eq!(ws.preview_content(), "");
        let pages = ws.create_node(root, "pages", NodeType::Folder).unwrap();
        let page = ws.import_file(pages, "page.html", "<p>hi</p>").unwrap();
        let css = ws.create_node(root, "a.css", NodeType::File).unwrap();
        assert_eq!(ws.active_file_id(), Some(css));
        let source = ws.preview_source().unwrap();
        assert_eq!(source.file_id, page);
        assert_eq!(source.content, "<p>hi</p>");
        assert_eq!(ws.html_files().len(), 1);
    }

    #[test]
    fn editor_binding_tracks_active_file() {
        let mut ws = workspace();
        let root = ws.root_id();
        assert!(ws.editor_binding().is_none());
        let file = ws.import_file(root, "a.json", "{}").unwrap();
        ws.set_active_file(file).unwrap();
        let binding = ws.editor_binding().unwrap();
        assert_eq!(binding.file_id, file);
        assert_eq!(binding.language, Language::Json);
        assert_eq!(binding.value, "{}");
        let json = serde_json::to_value(&binding).unwrap();
        assert_eq!(json["language"], "json");
    }

    #[test]
    fn no_op_changes_keep_the_snapshot() {
        let mut ws = workspace();
        let root = ws.root_id();
        let file = ws.create_node(root, "a.js", NodeType::File).unwrap();
        let before = ws.tree();
        let index = ws.flatten_all();
        ws.open_file(file).unwrap();
        ws.set_active_file(file).unwrap();
        ws.rename_node(file, "a.js").unwrap();
        assert!(Arc::ptr_eq(&before, &ws.tree()));
        assert!(Arc::ptr_eq(&index, &ws.flatten_all()));
        assert_eq!(ws.open_files(), &[file]);
    }
}
