// The file tree is an arena of reference-counted nodes keyed by id. Folders own
// the ids of their children; `parent_id` is only a lookup key.
//
// A `FileTree` value is a snapshot. Mutating methods are only ever called on a
// fresh clone (see `Workspace::commit`), and `Arc::make_mut` copies exactly the
// nodes that change, so older snapshots stay intact and untouched nodes stay
// shared between snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::errors::{ErrorType, PlaygroundError, Result};
use crate::vfs::node::{
    child_path, display_order, is_valid_name, Language, NodeId, VirtualNode,
};

#[derive(Debug, Clone)]
pub struct FileTree {
    root: NodeId,
    nodes: HashMap<NodeId, Arc<VirtualNode>>,
}

/// A node together with its depth below the root, in tree display order.
#[derive(Debug, Clone)]
pub struct VisibleNode {
    pub node: Arc<VirtualNode>,
    pub depth: usize,
}

impl FileTree {
    /// Creates a tree holding only an expanded root folder.
    pub fn new(root_name: &str) -> FileTree {
        let mut root = VirtualNode::new_folder(root_name, None);
        if let Some(folder) = root.as_folder_mut() {
            folder.is_expanded = true;
        }
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, Arc::new(root));
        FileTree {
            root: root_id,
            nodes,
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &VirtualNode {
        // The root is inserted at construction and can never be removed.
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: NodeId) -> Option<&VirtualNode> {
        self.nodes.get(&id).map(|n| n.as_ref())
    }

    #[cfg(test)]
    pub(crate) fn get_shared(&self, id: NodeId) -> Option<&Arc<VirtualNode>> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // A tree always has its root.
        false
    }

    /// Depth-first walk from the root in display order.
    pub fn walk(&self) -> Vec<VisibleNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.walk_from(self.root, 0, false, &mut out);
        out
    }

    /// Nodes a tree view should draw: the root, and the children of every
    /// expanded folder, in display order.
    pub fn visible_nodes(&self) -> Vec<VisibleNode> {
        let mut out = Vec::new();
        self.walk_from(self.root, 0, true, &mut out);
        out
    }

    fn walk_from(&self, id: NodeId, depth: usize, only_expanded: bool, out: &mut Vec<VisibleNode>) {
        let mut stack = vec![(id, depth)];
        while let Some((cur, depth)) = stack.pop() {
            let node = match self.nodes.get(&cur) {
                Some(n) => n,
                None => continue,
            };
            out.push(VisibleNode {
                node: node.clone(),
                depth,
            });
            if only_expanded && !node.is_expanded() {
                continue;
            }
            // Reversed so the first child in display order is popped first.
            stack.extend(
                self.display_children(cur)
                    .iter()
                    .rev()
                    .map(|child| (child.id, depth + 1)),
            );
        }
    }

    /// Children of a folder sorted for display: folders first, then by name.
    pub fn display_children(&self, id: NodeId) -> Vec<&VirtualNode> {
        let mut children: Vec<&VirtualNode> = match self.get(id) {
            Some(node) => node
                .children()
                .iter()
                .filter_map(|c| self.get(*c))
                .collect(),
            None => Vec::new(),
        };
        children.sort_by(|a, b| display_order(a, b));
        children
    }

    /// True when `ancestor` lies on the parent chain of `id` (or is `id`).
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.get(cur).and_then(|n| n.parent_id);
        }
        false
    }

    /// Ids of `id` and everything below it, parents before children.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.get(cur) {
                out.push(cur);
                stack.extend(node.children().iter().rev().copied());
            }
        }
        out
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut VirtualNode> {
        match self.nodes.get_mut(&id) {
            Some(node) => Ok(Arc::make_mut(node)),
            None => Err(PlaygroundError::not_found("Node", id)),
        }
    }

    fn folder(&self, id: NodeId, missing: ErrorType) -> Result<&VirtualNode> {
        let node = self
            .get(id)
            .ok_or_else(|| PlaygroundError::new(missing, format!("Folder {} does not exist", id)))?;
        if !node.is_folder() {
            return Err(PlaygroundError::new(
                ErrorType::NotAFolder,
                format!("{} is a file", node.path),
            ));
        }
        Ok(node)
    }

    fn check_name_free(&self, folder: &VirtualNode, name: &str, ignore: Option<NodeId>) -> Result<()> {
        if !is_valid_name(name) {
            return Err(PlaygroundError::new(
                ErrorType::InvalidName,
                format!("'{}' is not a valid file or folder name", name),
            ));
        }
        let taken = folder
            .children()
            .iter()
            .filter(|c| Some(**c) != ignore)
            .filter_map(|c| self.get(*c))
            .any(|c| c.name == name);
        if taken {
            return Err(PlaygroundError::new(
                ErrorType::AlreadyExists,
                format!("{} already exists", child_path(&folder.path, name)),
            ));
        }
        Ok(())
    }

    /// Attaches a prepared node under `parent_id`.
    #[instrument(level = "debug", skip(self, build))]
    pub(crate) fn insert_with<F>(&mut self, parent_id: NodeId, name: &str, build: F) -> Result<NodeId>
    where
        F: FnOnce(&VirtualNode) -> VirtualNode,
    {
        let parent = self.folder(parent_id, ErrorType::ParentNotFound)?;
        self.check_name_free(parent, name, None)?;
        let node = build(parent);
        let id = node.id;
        self.nodes.insert(id, Arc::new(node));
        if let Some(folder) = self.node_mut(parent_id)?.as_folder_mut() {
            folder.children.push(id);
        }
        Ok(id)
    }

    /// Detaches and drops a node with its whole subtree. Returns the removed ids.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        if id == self.root {
            return Err(PlaygroundError::new(
                ErrorType::NotPermitted,
                "Root folder cannot be removed!".to_string(),
            ));
        }
        let parent_id = self
            .get(id)
            .ok_or_else(|| PlaygroundError::not_found("Node", id))?
            .parent_id;
        let removed = self.subtree(id);
        if let Some(parent_id) = parent_id {
            if let Some(folder) = self.node_mut(parent_id)?.as_folder_mut() {
                folder.children.retain(|c| *c != id);
            }
        }
        for gone in &removed {
            self.nodes.remove(gone);
        }
        Ok(removed)
    }

    /// Renames a node, recomputing its language and the paths below it.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn rename(&mut self, id: NodeId, new_name: &str) -> Result<()> {
        let node = self.get(id).ok_or_else(|| PlaygroundError::not_found("Node", id))?;
        if node.name == new_name {
            return Ok(());
        }
        let new_path = match node.parent_id {
            Some(parent_id) => {
                let parent = self.folder(parent_id, ErrorType::ParentNotFound)?;
                self.check_name_free(parent, new_name, Some(id))?;
                child_path(&parent.path, new_name)
            }
            None => {
                if !is_valid_name(new_name) {
                    return Err(PlaygroundError::new(
                        ErrorType::InvalidName,
                        format!("'{}' is not a valid folder name", new_name),
                    ));
                }
                format!("/{}", new_name)
            }
        };

        let node = self.node_mut(id)?;
        node.name = new_name.to_string();
        node.path = new_path;
        if let Some(file) = node.as_file_mut() {
            file.language = Language::from_file_name(new_name);
        }
        self.refresh_paths_below(id);
        Ok(())
    }

    /// Moves a node under another folder, optionally at a given child index.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn move_node(
        &mut self,
        id: NodeId,
        target_id: NodeId,
        target_index: Option<usize>,
    ) -> Result<()> {
        if id == self.root {
            return Err(PlaygroundError::new(
                ErrorType::NotPermitted,
                "Root folder cannot be moved".to_string(),
            ));
        }
        let node = self.get(id).ok_or_else(|| PlaygroundError::not_found("Node", id))?;
        let old_parent_id = node.parent_id.ok_or_else(|| {
            PlaygroundError::new(ErrorType::NotPermitted, "Node has no parent".to_string())
        })?;
        let name = node.name.clone();
        let target = self.folder(target_id, ErrorType::NotFound)?;
        if self.is_ancestor_or_self(id, target_id) {
            return Err(PlaygroundError::new(
                ErrorType::CyclicMove,
                format!("Cannot move {} into itself or one of its descendants", node.path),
            ));
        }
        if old_parent_id != target_id {
            self.check_name_free(target, &name, None)?;
        }

        let old_index = self
            .get(old_parent_id)
            .and_then(|p| p.children().iter().position(|c| *c == id));
        if let Some(folder) = self.node_mut(old_parent_id)?.as_folder_mut() {
            folder.children.retain(|c| *c != id);
        }

        let target_path = {
            let target = self.node_mut(target_id)?;
            if let Some(folder) = target.as_folder_mut() {
                let mut index = target_index.unwrap_or(folder.children.len());
                // Removing the node shifted every later sibling down by one.
                if old_parent_id == target_id {
                    if let (Some(old), Some(_)) = (old_index, target_index) {
                        if old < index {
                            index -= 1;
                        }
                    }
                }
                let index = index.min(folder.children.len());
                folder.children.insert(index, id);
            }
            target.path.clone()
        };

        let node = self.node_mut(id)?;
        node.parent_id = Some(target_id);
        node.path = child_path(&target_path, &name);
        self.refresh_paths_below(id);
        Ok(())
    }

    pub(crate) fn toggle_expansion(&mut self, id: NodeId) -> Result<bool> {
        let node = self.get(id).ok_or_else(|| PlaygroundError::not_found("Node", id))?;
        if !node.is_folder() {
            return Ok(false);
        }
        let mut expanded = false;
        if let Some(folder) = self.node_mut(id)?.as_folder_mut() {
            folder.is_expanded = !folder.is_expanded;
            expanded = folder.is_expanded;
        }
        Ok(expanded)
    }

    pub(crate) fn set_content(&mut self, id: NodeId, content: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        let path = node.path.clone();
        match node.as_file_mut() {
            Some(file) => {
                file.content = content.to_string();
                file.is_dirty = true;
                Ok(())
            }
            None => Err(PlaygroundError::new(
                ErrorType::NotAFile,
                format!("{} is a folder", path),
            )),
        }
    }

    pub(crate) fn set_open(&mut self, id: NodeId, open: bool) -> Result<()> {
        let already = self
            .get(id)
            .ok_or_else(|| PlaygroundError::not_found("Node", id))?
            .is_open();
        if already == open {
            return Ok(());
        }
        if let Some(file) = self.node_mut(id)?.as_file_mut() {
            file.is_open = open;
        }
        Ok(())
    }

    fn refresh_paths_below(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let (path, children) = match self.get(cur) {
                Some(node) => (node.path.clone(), node.children().to_vec()),
                None => continue,
            };
            for child in children {
                if let Some(entry) = self.nodes.get_mut(&child) {
                    let expected = child_path(&path, &entry.name);
                    if entry.path != expected {
                        Arc::make_mut(entry).path = expected;
                    }
                }
                stack.push(child);
            }
        }
    }
}
