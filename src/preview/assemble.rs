use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::instrument;

use crate::errors::Result;
use crate::preview::materialize::Materializer;
use crate::preview::resolve::{is_external, resolve_from_file, strip_query};
use crate::preview::transform::{
    transform_css_imports, transform_js_imports, PreviewWarning, TransformContext,
};
use crate::vfs::FileIndex;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

static CLOSING_RAW_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</(style|script)").unwrap());

/// Result of one preview render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewOutput {
    /// The self-contained document handed to the preview host.
    pub html: String,
    /// Absolute paths inlined into the document, in document order.
    pub dependencies: Vec<String>,
    pub warnings: Vec<PreviewWarning>,
    /// References handed out by the materializer for nested imports.
    pub materialized: Vec<String>,
    /// True when the document could not be assembled and `html` is the raw
    /// source.
    pub fell_back: bool,
}

enum Inline {
    Stylesheet { node: Handle, path: String, media: Option<String> },
    Script { node: Handle, path: String, module: bool },
}

/// Inlines every local stylesheet and script referenced by `html` so the
/// result renders without access to the file tree. `html_path` is the
/// absolute path of the document; references resolve against it.
///
/// Missing dependencies never fail the render: the original tag is left in
/// place and a warning is returned alongside the document. If assembling
/// fails outright, the raw `html` is returned with `fell_back` set.
#[instrument(skip(html, index, materializer))]
pub fn assemble_preview(
    html: &str,
    html_path: &str,
    index: &FileIndex,
    materializer: &mut dyn Materializer,
) -> PreviewOutput {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        inline_document(html, html_path, index, materializer)
    }));
    match attempt {
        Ok(output) => output,
        Err(payload) => fall_back(html, Vec::new(), Vec::new(), panic_message(&*payload)),
    }
}

fn inline_document(
    html: &str,
    html_path: &str,
    index: &FileIndex,
    materializer: &mut dyn Materializer,
) -> PreviewOutput {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    let mut cx = TransformContext::new(index, materializer);

    let mut found = Vec::new();
    collect_inlines(&dom.document, html_path, &mut cx, &mut found);

    let mut dependencies: Vec<String> = Vec::new();
    for inline in found {
        match inline {
            Inline::Stylesheet { node, path, media } => {
                let source = index.file_at(&path).and_then(|f| f.content()).unwrap_or_default();
                let css = transform_css_imports(source, &path, &mut cx);
                let mut attrs = Vec::new();
                if let Some(media) = media {
                    attrs.push(attribute("media", &media));
                }
                let style = element("style", attrs);
                append_text(&style, &escape_raw_text(&css));
                replace_node(&node, style);
                record(&mut dependencies, path);
            }
            Inline::Script { node, path, module } => {
                let source = index.file_at(&path).and_then(|f| f.content()).unwrap_or_default();
                let js = if module {
                    transform_js_imports(source, &path, &mut cx)
                } else {
                    source.to_string()
                };
                if let NodeData::Element { attrs, .. } = &node.data {
                    attrs.borrow_mut().retain(|a| !is_named(a, "src"));
                }
                node.children.borrow_mut().clear();
                append_text(&node, &escape_raw_text(&js));
                record(&mut dependencies, path);
            }
        }
    }

    let rendered = serialize_document(&dom);
    let (warnings, materialized, _) = cx.into_parts();
    match rendered {
        Ok(html) => {
            tracing::debug!(
                "Assembled {} with {} dependencies and {} warnings",
                html_path,
                dependencies.len(),
                warnings.len()
            );
            PreviewOutput {
                html,
                dependencies,
                warnings,
                materialized,
                fell_back: false,
            }
        }
        Err(e) => fall_back(html, warnings, materialized, e.to_string()),
    }
}

fn fall_back(
    html: &str,
    mut warnings: Vec<PreviewWarning>,
    materialized: Vec<String>,
    message: String,
) -> PreviewOutput {
    let warning = PreviewWarning::RenderFailed { message };
    tracing::error!("{}", warning);
    warnings.push(warning);
    PreviewOutput {
        html: html.to_string(),
        dependencies: Vec::new(),
        warnings,
        materialized,
        fell_back: true,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "assembly panicked".to_string()
    }
}

/// Finds the tags to inline, in document order. The walk keeps its own stack
/// so deeply nested markup cannot exhaust the thread's.
fn collect_inlines(document: &Handle, html_path: &str, cx: &mut TransformContext, found: &mut Vec<Inline>) {
    let mut stack = vec![document.clone()];
    while let Some(node) = stack.pop() {
        inspect_element(&node, html_path, cx, found);
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
}

fn inspect_element(node: &Handle, html_path: &str, cx: &mut TransformContext, found: &mut Vec<Inline>) {
    let (name, attrs) = match &node.data {
        NodeData::Element { name, attrs, .. } if &*name.ns == HTML_NS => (name, attrs.borrow()),
        _ => return,
    };
    match &*name.local {
        "link" if is_stylesheet(&attrs) => {
            if let Some(href) = local_reference(&attrs, "href") {
                let path = resolve_from_file(html_path, strip_query(&href));
                if cx.index().file_at(&path).is_some() {
                    found.push(Inline::Stylesheet {
                        node: node.clone(),
                        path,
                        media: attr_value(&attrs, "media"),
                    });
                } else {
                    cx.warn(PreviewWarning::StylesheetNotFound { href, resolved: path });
                }
            }
        }
        "script" => {
            if let Some(src) = local_reference(&attrs, "src") {
                let path = resolve_from_file(html_path, strip_query(&src));
                if cx.index().file_at(&path).is_some() {
                    let module = attr_value(&attrs, "type")
                        .map_or(false, |t| t.trim().eq_ignore_ascii_case("module"));
                    found.push(Inline::Script {
                        node: node.clone(),
                        path,
                        module,
                    });
                } else {
                    cx.warn(PreviewWarning::ScriptNotFound { src, resolved: path });
                }
            }
        }
        _ => {}
    }
}

fn serialize_document(dom: &RcDom) -> Result<String> {
    let mut bytes = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut bytes, &document, SerializeOpts::default())?;
    Ok(String::from_utf8(bytes)?)
}

fn record(dependencies: &mut Vec<String>, path: String) {
    if !dependencies.contains(&path) {
        dependencies.push(path);
    }
}

fn is_named(attr: &Attribute, name: &str) -> bool {
    &*attr.name.local == name
}

fn attr_value(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| is_named(a, name))
        .map(|a| a.value.to_string())
}

/// The attribute's value when it names something inside the file tree.
fn local_reference(attrs: &[Attribute], name: &str) -> Option<String> {
    attr_value(attrs, name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !is_external(v))
}

/// `rel` names a stylesheet that applies by default. Alternate stylesheets
/// stay links so they remain switched off.
fn is_stylesheet(attrs: &[Attribute]) -> bool {
    attr_value(attrs, "rel").map_or(false, |rel| {
        let has = |wanted: &str| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case(wanted))
        };
        has("stylesheet") && !has("alternate")
    })
}

fn escape_raw_text(text: &str) -> String {
    CLOSING_RAW_TAG.replace_all(text, "<\\/$1").into_owned()
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NS), LocalName::from(local))
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

fn element(local: &str, attrs: Vec<Attribute>) -> Handle {
    Node::new(NodeData::Element {
        name: html_name(local),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn append_text(parent: &Handle, text: &str) {
    let node = Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    });
    node.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(node);
}

fn replace_node(old: &Handle, new: Handle) {
    let parent = match old.parent.take().and_then(|weak| weak.upgrade()) {
        Some(parent) => parent,
        None => return,
    };
    let mut children = parent.children.borrow_mut();
    if let Some(pos) = children.iter().position(|c| Rc::ptr_eq(c, old)) {
        new.parent.set(Some(Rc::downgrade(&parent)));
        children[pos] = new;
    }
}
