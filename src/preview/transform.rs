// Recursive rewriting of CSS `@import` and JS module imports.
//
// One `TransformContext` lives for exactly one render. Its memo maps an
// absolute path to the reference materialized for it, so a file reachable
// through several importers is processed once. A path is marked in progress
// before its own imports are rewritten; meeting that marker again means an
// import cycle, and the offending reference is left untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::preview::materialize::{Materializer, CSS_MIME, JS_MIME};
use crate::preview::resolve::{is_bare_specifier, is_external, resolve_from_file, strip_query};
use crate::vfs::FileIndex;

static CSS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@import\s+(?:url\s*\(\s*)?["']([^"']+)["'](?:\s*\))?([^;]*);"#).unwrap()
});

static JS_STATIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:import|export)\s+(?:(?:\{[^}]*\}|[^'";]*?)\s*from\s*)?["']([^"'\n]+)["']"#)
        .unwrap()
});

static JS_DYNAMIC_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Css,
    Js,
}

impl ImportKind {
    fn mime(&self) -> &'static str {
        match self {
            ImportKind::Css => CSS_MIME,
            ImportKind::Js => JS_MIME,
        }
    }
}

/// Something the preview could not resolve. The render still completes; the
/// reference stays in the output as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewWarning {
    StylesheetNotFound { href: String, resolved: String },
    ScriptNotFound { src: String, resolved: String },
    ImportNotFound {
        import: ImportKind,
        specifier: String,
        resolved: String,
        importer: String,
    },
    CircularImport {
        import: ImportKind,
        specifier: String,
        resolved: String,
        importer: String,
    },
    RenderFailed { message: String },
}

impl fmt::Display for PreviewWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewWarning::StylesheetNotFound { href, resolved } => {
                write!(f, "CSS file not found: {} (resolved to {})", href, resolved)
            }
            PreviewWarning::ScriptNotFound { src, resolved } => {
                write!(f, "JS file not found: {} (resolved to {})", src, resolved)
            }
            PreviewWarning::ImportNotFound {
                import,
                specifier,
                resolved,
                importer,
            } => write!(
                f,
                "{:?} import not found: {} in {} (resolved to {})",
                import, specifier, importer, resolved
            ),
            PreviewWarning::CircularImport {
                import,
                specifier,
                resolved,
                importer,
            } => write!(
                f,
                "{:?} import cycle: {} imports {} ({}) while it is still being processed",
                import, importer, specifier, resolved
            ),
            PreviewWarning::RenderFailed { message } => {
                write!(f, "preview fell back to raw HTML: {}", message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MemoEntry {
    InProgress,
    Ready(String),
}

pub struct TransformContext<'a> {
    index: &'a FileIndex,
    materializer: &'a mut dyn Materializer,
    memo: HashMap<String, MemoEntry>,
    warnings: Vec<PreviewWarning>,
    materialized: Vec<String>,
    imported_paths: Vec<String>,
}

impl<'a> TransformContext<'a> {
    pub fn new(index: &'a FileIndex, materializer: &'a mut dyn Materializer) -> Self {
        TransformContext {
            index,
            materializer,
            memo: HashMap::new(),
            warnings: Vec::new(),
            materialized: Vec::new(),
            imported_paths: Vec::new(),
        }
    }

    pub fn index(&self) -> &'a FileIndex {
        self.index
    }

    pub fn warn(&mut self, warning: PreviewWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[PreviewWarning] {
        &self.warnings
    }

    /// References materialized so far in this render.
    pub fn materialized(&self) -> &[String] {
        &self.materialized
    }

    /// Absolute paths of nested imports materialized so far, in the order
    /// they finished.
    pub fn imported_paths(&self) -> &[String] {
        &self.imported_paths
    }

    pub fn into_parts(self) -> (Vec<PreviewWarning>, Vec<String>, Vec<String>) {
        (self.warnings, self.materialized, self.imported_paths)
    }

    /// Returns the reference for the dependency at `resolved`, processing and
    /// materializing it first when this render has not seen it yet.
    fn dependency_url(
        &mut self,
        kind: ImportKind,
        specifier: &str,
        resolved: &str,
        importer: &str,
    ) -> Option<String> {
        match self.memo.get(resolved) {
            Some(MemoEntry::Ready(url)) => return Some(url.clone()),
            Some(MemoEntry::InProgress) => {
                self.warn(PreviewWarning::CircularImport {
                    import: kind,
                    specifier: specifier.to_string(),
                    resolved: resolved.to_string(),
                    importer: importer.to_string(),
                });
                return None;
            }
            None => {}
        }

        let index = self.index;
        let source = match index.file_at(resolved).and_then(|f| f.content()) {
            Some(content) => content,
            None => {
                self.warn(PreviewWarning::ImportNotFound {
                    import: kind,
                    specifier: specifier.to_string(),
                    resolved: resolved.to_string(),
                    importer: importer.to_string(),
                });
                return None;
            }
        };

        self.memo.insert(resolved.to_string(), MemoEntry::InProgress);
        let processed = match kind {
            ImportKind::Css => transform_css_imports(source, resolved, self),
            ImportKind::Js => transform_js_imports(source, resolved, self),
        };
        let url = self.materializer.materialize(resolved, kind.mime(), &processed);
        tracing::debug!("Materialized {} ({} bytes)", resolved, processed.len());
        self.memo
            .insert(resolved.to_string(), MemoEntry::Ready(url.clone()));
        self.materialized.push(url.clone());
        self.imported_paths.push(resolved.to_string());
        Some(url)
    }
}

/// Rewrites every local `@import` in `css` to a materialized copy of the
/// imported stylesheet, itself rewritten recursively. `css_path` is the
/// absolute path of the stylesheet being processed.
pub fn transform_css_imports(css: &str, css_path: &str, cx: &mut TransformContext) -> String {
    CSS_IMPORT
        .replace_all(css, |caps: &Captures| {
            let whole = &caps[0];
            let specifier = &caps[1];
            let rest = caps.get(2).map_or("", |m| m.as_str());
            if is_external(specifier) {
                return whole.to_string();
            }
            let resolved = resolve_from_file(css_path, strip_query(specifier));
            match cx.dependency_url(ImportKind::Css, specifier, &resolved, css_path) {
                Some(url) => format!("@import url(\"{}\"){};", url, rest),
                None => whole.to_string(),
            }
        })
        .into_owned()
}

/// Rewrites local module specifiers in `js` (static imports, re-exports and
/// dynamic `import()`) to materialized copies of the imported modules. Bare
/// package specifiers and external URLs are left alone.
pub fn transform_js_imports(js: &str, js_path: &str, cx: &mut TransformContext) -> String {
    let pass = rewrite_specifiers(&JS_STATIC_IMPORT, js, js_path, cx);
    rewrite_specifiers(&JS_DYNAMIC_IMPORT, &pass, js_path, cx)
}

fn rewrite_specifiers(pattern: &Regex, js: &str, js_path: &str, cx: &mut TransformContext) -> String {
    pattern
        .replace_all(js, |caps: &Captures| {
            // Both patterns always capture the whole match and the specifier.
            let (whole, target) = match (caps.get(0), caps.get(1)) {
                (Some(w), Some(t)) => (w, t),
                _ => return caps[0].to_string(),
            };
            let specifier = target.as_str();
            if is_bare_specifier(specifier) || is_external(specifier) {
                return whole.as_str().to_string();
            }
            let resolved = resolve_from_file(js_path, strip_query(specifier));
            match cx.dependency_url(ImportKind::Js, specifier, &resolved, js_path) {
                Some(url) => {
                    let text = whole.as_str();
                    let start = target.start() - whole.start();
                    let end = target.end() - whole.start();
                    format!("{}{}{}", &text[..start], url, &text[end..])
                }
                None => whole.as_str().to_string(),
            }
        })
        .into_owned()
}
