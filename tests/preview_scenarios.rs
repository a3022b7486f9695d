use playbox::preview::{decode_data_url, BlobRegistry, Materializer};
use playbox::vfs::NodeType;
use playbox::{PlaygroundConfig, PreviewEngine, PreviewWarning, Workspace};
use pretty_assertions::assert_eq;

const PAGE: &str = r#"<html><head><link rel="stylesheet" href="style.css"></head><body><script src="script.js"></script></body></html>"#;

fn site(files: &[(&str, &str)]) -> Workspace {
    let mut ws = Workspace::empty("site").unwrap();
    let root = ws.root_id();
    for (name, content) in files {
        ws.import_file(root, name, content).unwrap();
    }
    ws
}

#[test]
fn local_dependencies_are_inlined() {
    let mut ws = site(&[
        ("index.html", PAGE),
        ("style.css", "body{color:red}"),
        ("script.js", "console.log(1)"),
    ]);
    let index = ws.node_at("/site/index.html").unwrap().id;
    ws.set_active_file(index).unwrap();

    let mut engine = PreviewEngine::from_config(&PlaygroundConfig::default());
    let out = engine.render(&ws);
    assert!(out.html.contains("<style>body{color:red}</style>"));
    assert!(out.html.contains("<script>console.log(1)</script>"));
    assert!(!out.html.contains("<link"));
    assert!(!out.html.contains("<script src="));
    assert!(out.warnings.is_empty());
}

#[test]
fn missing_stylesheet_falls_back_to_the_link() {
    let ws = site(&[("index.html", PAGE), ("script.js", "console.log(1)")]);
    let mut engine = PreviewEngine::from_config(&PlaygroundConfig::default());
    let out = engine.render(&ws);
    assert!(!out.fell_back);
    assert!(out.html.contains(r#"<link rel="stylesheet" href="style.css">"#));
    assert_eq!(out.warnings.len(), 1);
    assert!(matches!(out.warnings[0], PreviewWarning::StylesheetNotFound { .. }));
}

#[test]
fn seeded_workspace_previews_its_starter_page() {
    let ws = Workspace::new(&PlaygroundConfig::default()).unwrap();
    let mut engine = PreviewEngine::from_config(&PlaygroundConfig::default());
    let out = engine.render(&ws);
    assert!(out.html.contains("<h1>Hello from Playbox</h1>"));
    assert!(out.html.contains("font-family: system-ui"));
    assert!(out.html.contains("getElementById('counter')"));
    assert_eq!(
        out.dependencies,
        vec!["/PLAYBOX/style.css".to_string(), "/PLAYBOX/script.js".to_string()]
    );
}

#[test]
fn editing_a_dependency_updates_the_preview() {
    let mut ws = site(&[("index.html", PAGE), ("style.css", "body{color:red}"), ("script.js", "")]);
    let mut engine = PreviewEngine::from_config(&PlaygroundConfig::default());
    engine.render(&ws);
    let css = ws.node_at("/site/style.css").unwrap().id;
    ws.update_content(css, "body{color:blue}").unwrap();
    let (out, rendered) = engine.refresh(&ws);
    assert!(rendered);
    assert!(out.html.contains("color:blue"));
}

#[test]
fn nested_css_imports_resolve_relative_to_the_importer() {
    let mut ws = Workspace::empty("site").unwrap();
    let root = ws.root_id();
    ws.import_file(
        root,
        "index.html",
        r#"<html><head><link rel="stylesheet" href="styles/main.css"></head></html>"#,
    )
    .unwrap();
    let styles = ws.create_node(root, "styles", NodeType::Folder).unwrap();
    let parts = ws.create_node(styles, "parts", NodeType::Folder).unwrap();
    ws.import_file(styles, "main.css", "@import \"parts/a.css\";").unwrap();
    ws.import_file(parts, "a.css", "@import \"../base.css\";\n.a{}").unwrap();
    ws.import_file(styles, "base.css", ".base{}").unwrap();

    let mut engine = PreviewEngine::from_config(&PlaygroundConfig::default());
    let out = engine.render(&ws);
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    assert_eq!(out.materialized.len(), 2);
    let base = decode_data_url(&out.materialized[0]).unwrap();
    assert_eq!(base, ".base{}");
    let a = decode_data_url(&out.materialized[1]).unwrap();
    assert!(a.starts_with(&format!("@import url(\"{}\");", out.materialized[0])));
}

#[test]
fn circular_module_imports_terminate() {
    let ws = site(&[
        (
            "index.html",
            r#"<html><body><script type="module" src="a.js"></script></body></html>"#,
        ),
        ("a.js", "import { b } from './b.js';\nexport const a = 1;"),
        ("b.js", "import { a } from './a.js';\nexport const b = 2;"),
    ]);
    let mut engine = PreviewEngine::new(Box::new(BlobRegistry::default()));
    let out = engine.render(&ws).clone();
    assert_eq!(out.dependencies, vec!["/site/a.js".to_string()]);
    assert!(out
        .warnings
        .iter()
        .any(|w| matches!(w, PreviewWarning::CircularImport { .. })));
    assert_eq!(engine.materializer().live_count(), out.materialized.len());
}

#[test]
fn warnings_serialize_with_a_kind_tag() {
    let warning = PreviewWarning::ScriptNotFound {
        src: "app.js".to_string(),
        resolved: "/site/app.js".to_string(),
    };
    let json = serde_json::to_value(&warning).unwrap();
    assert_eq!(json["kind"], "script_not_found");
    assert_eq!(json["resolved"], "/site/app.js");
}
