// Turns the workspace's HTML entry point into a single self-contained
// document: local stylesheets and scripts are inlined, and their nested
// imports are materialized and rewritten.

pub(crate) mod assemble;
pub(crate) mod engine;
pub(crate) mod materialize;
pub(crate) mod resolve;
pub(crate) mod transform;

pub use assemble::{assemble_preview, PreviewOutput};
pub use engine::PreviewEngine;
pub use materialize::{
    build_materializer, decode_data_url, BlobRegistry, DataUrlMaterializer, MaterializeMode,
    MaterializedResource, Materializer, CSS_MIME, JS_MIME,
};
pub use resolve::{
    has_scheme, is_bare_specifier, is_external, parent_dir, resolve_from_file, resolve_path,
    strip_query,
};
pub use transform::{
    transform_css_imports, transform_js_imports, ImportKind, PreviewWarning, TransformContext,
};
