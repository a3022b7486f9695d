use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a node, stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub(crate) fn new() -> NodeId {
        NodeId(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Html,
    Css,
    JavaScript,
    TypeScript,
    Json,
    PlainText,
}

impl Language {
    /// Infers the language from the extension of a file name.
    pub fn from_file_name(name: &str) -> Language {
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return Language::PlainText,
        };
        match ext.as_str() {
            "html" | "htm" => Language::Html,
            "css" => Language::Css,
            "js" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "mts" => Language::TypeScript,
            "json" => Language::Json,
            _ => Language::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Html => "html",
            Language::Css => "css",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Json => "json",
            Language::PlainText => "plaintext",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested kind for a node that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileData {
    pub content: String,
    pub language: Language,
    pub is_dirty: bool,
    pub is_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderData {
    /// Child ids in insertion order. Display order is computed, see
    /// [`display_order`].
    pub children: Vec<NodeId>,
    pub is_expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    File(FileData),
    Folder(FolderData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualNode {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    pub parent_id: Option<NodeId>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl VirtualNode {
    pub(crate) fn new_file(
        name: &str,
        parent: &VirtualNode,
        content: String,
    ) -> VirtualNode {
        VirtualNode {
            id: NodeId::new(),
            name: name.to_string(),
            path: child_path(&parent.path, name),
            parent_id: Some(parent.id),
            kind: NodeKind::File(FileData {
                content,
                language: Language::from_file_name(name),
                is_dirty: false,
                is_open: false,
            }),
        }
    }

    pub(crate) fn new_folder(name: &str, parent: Option<&VirtualNode>) -> VirtualNode {
        let path = match parent {
            Some(p) => child_path(&p.path, name),
            None => format!("/{}", name),
        };
        VirtualNode {
            id: NodeId::new(),
            name: name.to_string(),
            path,
            parent_id: parent.map(|p| p.id),
            kind: NodeKind::Folder(FolderData {
                children: Vec::new(),
                is_expanded: false,
            }),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::File(_) => NodeType::File,
            NodeKind::Folder(_) => NodeType::Folder,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn as_file(&self) -> Option<&FileData> {
        match &self.kind {
            NodeKind::File(f) => Some(f),
            NodeKind::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderData> {
        match &self.kind {
            NodeKind::Folder(f) => Some(f),
            NodeKind::File(_) => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut FileData> {
        match &mut self.kind {
            NodeKind::File(f) => Some(f),
            NodeKind::Folder(_) => None,
        }
    }

    pub(crate) fn as_folder_mut(&mut self) -> Option<&mut FolderData> {
        match &mut self.kind {
            NodeKind::Folder(f) => Some(f),
            NodeKind::File(_) => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.as_file().map(|f| f.content.as_str())
    }

    pub fn language(&self) -> Option<Language> {
        self.as_file().map(|f| f.language)
    }

    pub fn is_dirty(&self) -> bool {
        self.as_file().map_or(false, |f| f.is_dirty)
    }

    pub fn is_open(&self) -> bool {
        self.as_file().map_or(false, |f| f.is_open)
    }

    pub fn is_expanded(&self) -> bool {
        self.as_folder().map_or(false, |f| f.is_expanded)
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder(f) => &f.children,
            NodeKind::File(_) => &[],
        }
    }
}

pub(crate) fn child_path(parent_path: &str, name: &str) -> String {
    format!("{}/{}", parent_path.trim_end_matches('/'), name)
}

/// Tree display order: folders first, then files, each sorted by name.
pub fn display_order(a: &VirtualNode, b: &VirtualNode) -> Ordering {
    match (a.is_folder(), b.is_folder()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
    }
}

/// A node name must be a single, non-empty path segment.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_follows_extension() {
        assert_eq!(Language::from_file_name("index.html"), Language::Html);
        assert_eq!(Language::from_file_name("page.HTM"), Language::Html);
        assert_eq!(Language::from_file_name("style.css"), Language::Css);
        assert_eq!(Language::from_file_name("a.js"), Language::JavaScript);
        assert_eq!(Language::from_file_name("a.mjs"), Language::JavaScript);
        assert_eq!(Language::from_file_name("a.ts"), Language::TypeScript);
        assert_eq!(Language::from_file_name("package.json"), Language::Json);
        assert_eq!(Language::from_file_name("README"), Language::PlainText);
        assert_eq!(Language::from_file_name("notes.md"), Language::PlainText);
    }

    #[test]
    fn language_serializes_lowercase() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
    }

    #[test]
    fn names_are_single_segments() {
        assert!(is_valid_name("a.css"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
    }

    #[test]
    fn folders_sort_before_files() {
        let root = VirtualNode::new_folder("root", None);
        let file = VirtualNode::new_file("a.css", &root, String::new());
        let folder = VirtualNode::new_folder("z", Some(&root));
        let upper = VirtualNode::new_file("B.js", &root, String::new());
        let mut nodes = vec![&upper, &file, &folder];
        nodes.sort_by(|a, b| display_order(a, b));
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a.css", "B.js"]);
    }
}
