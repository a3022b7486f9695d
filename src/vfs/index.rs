use std::collections::HashMap;
use std::sync::Arc;

use crate::vfs::node::{NodeId, VirtualNode};
use crate::vfs::tree::FileTree;

/// Flat view of every node reachable from the root, rebuilt after each tree
/// change. Lookups by id and by absolute path are O(1).
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    by_id: HashMap<NodeId, Arc<VirtualNode>>,
    by_path: HashMap<String, NodeId>,
}

impl FileIndex {
    pub fn from_tree(tree: &FileTree) -> FileIndex {
        let mut index = FileIndex::default();
        for entry in tree.walk() {
            index.by_path.insert(entry.node.path.clone(), entry.node.id);
            index.by_id.insert(entry.node.id, entry.node);
        }
        index
    }

    pub fn get(&self, id: NodeId) -> Option<&VirtualNode> {
        self.by_id.get(&id).map(|n| n.as_ref())
    }

    pub fn at_path(&self, path: &str) -> Option<&VirtualNode> {
        self.by_path.get(path).and_then(|id| self.get(*id))
    }

    /// The file (never a folder) stored at an absolute path.
    pub fn file_at(&self, path: &str) -> Option<&VirtualNode> {
        self.at_path(path).filter(|n| n.is_file())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &VirtualNode)> {
        self.by_id.iter().map(|(id, n)| (id, n.as_ref()))
    }

    pub fn as_map(&self) -> &HashMap<NodeId, Arc<VirtualNode>> {
        &self.by_id
    }
}
