// In-memory file tree for a playground session. Nothing here touches disk;
// see `vfsio` for loading a tree from a directory.

pub(crate) mod index;
pub(crate) mod node;
pub(crate) mod templates;
pub(crate) mod tree;
pub(crate) mod workspace;

pub use index::FileIndex;
pub use node::{display_order, FileData, FolderData, Language, NodeId, NodeKind, NodeType, VirtualNode};
pub use templates::default_content;
pub use tree::{FileTree, VisibleNode};
pub use workspace::{EditorBinding, PreviewSource, TabInfo, Workspace};
