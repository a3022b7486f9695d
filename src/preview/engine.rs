use std::sync::Arc;
use tracing::instrument;

use crate::config::PlaygroundConfig;
use crate::preview::assemble::{assemble_preview, PreviewOutput};
use crate::preview::materialize::{build_materializer, Materializer};
use crate::vfs::{FileIndex, NodeId, Workspace};

/// Renders the workspace's preview document and owns the references each
/// render materializes. A render releases whatever the previous one handed
/// out, so only the current document's references stay live.
pub struct PreviewEngine {
    materializer: Box<dyn Materializer>,
    last_index: Option<Arc<FileIndex>>,
    last_active: Option<NodeId>,
    output: PreviewOutput,
}

impl PreviewEngine {
    pub fn new(materializer: Box<dyn Materializer>) -> PreviewEngine {
        PreviewEngine {
            materializer,
            last_index: None,
            last_active: None,
            output: PreviewOutput::default(),
        }
    }

    pub fn from_config(config: &PlaygroundConfig) -> PreviewEngine {
        PreviewEngine::new(build_materializer(config.materialize))
    }

    /// Renders unconditionally.
    #[instrument(skip(self, workspace))]
    pub fn render(&mut self, workspace: &Workspace) -> &PreviewOutput {
        let index = workspace.flatten_all();
        let output = match workspace.preview_source() {
            Some(source) => {
                assemble_preview(&source.content, &source.path, &index, self.materializer.as_mut())
            }
            None => {
                tracing::debug!("No HTML file in the tree, preview is empty");
                PreviewOutput::default()
            }
        };

        let superseded = std::mem::replace(&mut self.output, output);
        self.materializer.release(&superseded.materialized);
        self.last_index = Some(index);
        self.last_active = workspace.active_file_id();
        tracing::info!(
            "Rendered preview: {} dependencies, {} warnings, {} live references",
            self.output.dependencies.len(),
            self.output.warnings.len(),
            self.materializer.live_count()
        );
        &self.output
    }

    /// Renders only when the tree snapshot or the active file changed since
    /// the last render. The flag tells whether a new render happened.
    pub fn refresh(&mut self, workspace: &Workspace) -> (&PreviewOutput, bool) {
        let index = workspace.flatten_all();
        let unchanged = self
            .last_index
            .as_ref()
            .map_or(false, |last| Arc::ptr_eq(last, &index))
            && self.last_active == workspace.active_file_id();
        if unchanged {
            return (&self.output, false);
        }
        (self.render(workspace), true)
    }

    pub fn output(&self) -> &PreviewOutput {
        &self.output
    }

    pub fn materializer(&self) -> &dyn Materializer {
        self.materializer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::materialize::{BlobRegistry, MaterializeMode};
    use crate::vfs::NodeType;

    fn module_site() -> Workspace {
        let mut ws = Workspace::empty("site").unwrap();
        let root = ws.root_id();
        ws.import_file(
            root,
            "index.html",
            r#"<html><body><script type="module" src="main.js"></script></body></html>"#,
        )
        .unwrap();
        ws.import_file(root, "main.js", "import './a.js';\nimport './b.js';").unwrap();
        ws.import_file(root, "a.js", "export const a = 1;").unwrap();
        ws.import_file(root, "b.js", "export const b = 2;").unwrap();
        ws
    }

    #[test]
    fn refresh_skips_unchanged_snapshots() {
        let mut ws = module_site();
        let mut engine = PreviewEngine::new(Box::new(BlobRegistry::default()));
        let (_, rendered) = engine.refresh(&ws);
        assert!(rendered);
        let (_, rendered) = engine.refresh(&ws);
        assert!(!rendered);

        let a = ws.node_at("/site/a.js").unwrap().id;
        ws.update_content(a, "export const a = 3;").unwrap();
        let (_, rendered) = engine.refresh(&ws);
        assert!(rendered);
    }

    #[test]
    fn superseded_references_are_released() {
        let ws = module_site();
        let mut engine = PreviewEngine::new(Box::new(BlobRegistry::default()));
        let first = engine.render(&ws).materialized.clone();
        assert_eq!(first.len(), 2);
        assert_eq!(engine.materializer().live_count(), 2);
        for _ in 0..5 {
            engine.render(&ws);
        }
        assert_eq!(engine.materializer().live_count(), 2);
        assert!(engine.materializer().resolve(&first[0]).is_none());
        let current = &engine.output().materialized[0];
        assert!(engine.materializer().resolve(current).is_some());
    }

    #[test]
    fn empty_tree_renders_nothing() {
        let mut ws = Workspace::empty("site").unwrap();
        let root = ws.root_id();
        ws.create_node(root, "notes.txt", NodeType::File).unwrap();
        let mut engine = PreviewEngine::new(Box::new(BlobRegistry::default()));
        let out = engine.render(&ws);
        assert_eq!(out.html, "");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn switching_to_another_html_file_re_renders() {
        let mut ws = module_site();
        let root = ws.root_id();
        let about = ws.create_node(root, "about.html", NodeType::File).unwrap();
        let config = PlaygroundConfig {
            materialize: MaterializeMode::DataUrl,
            ..PlaygroundConfig::default()
        };
        let mut engine = PreviewEngine::from_config(&config);
        engine.render(&ws);
        let index = ws.node_at("/site/index.html").unwrap().id;
        ws.set_active_file(index).unwrap();
        let (out, rendered) = engine.refresh(&ws);
        assert!(rendered);
        assert!(out.html.contains("<script type=\"module\">"));
        ws.set_active_file(about).unwrap();
        let (out, rendered) = engine.refresh(&ws);
        assert!(rendered);
        assert!(!out.html.contains("<script type=\"module\">"));
    }

    #[test]
    fn reopening_the_active_tab_does_not_re_render() {
        let mut ws = module_site();
        let index = ws.node_at("/site/index.html").unwrap().id;
        ws.open_file(index).unwrap();
        let mut engine = PreviewEngine::new(Box::new(BlobRegistry::default()));
        engine.render(&ws);
        ws.open_file(index).unwrap();
        ws.rename_node(index, "index.html").unwrap();
        let (_, rendered) = engine.refresh(&ws);
        assert!(!rendered);
    }
}
