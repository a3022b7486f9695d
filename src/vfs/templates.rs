// Starter content for new files and the session seed tree.

use crate::vfs::node::Language;

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Untitled</title>
</head>
<body>
    <h1>New page</h1>
</body>
</html>
"#;

const CSS_TEMPLATE: &str = r#"/* styles */

body {
  margin: 0;
}
"#;

const JS_TEMPLATE: &str = r#"// script

console.log('ready');
"#;

pub(crate) const SEED_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Playbox</title>
    <link rel="stylesheet" href="style.css">
</head>
<body>
    <h1>Hello from Playbox</h1>
    <div class="card">
        <p>Edit any file and the preview follows.</p>
        <button id="counter">Clicked 0 times</button>
    </div>
    <script src="script.js"></script>
</body>
</html>
"#;

pub(crate) const SEED_STYLE_CSS: &str = r#"body {
  font-family: system-ui, sans-serif;
  max-width: 800px;
  margin: 0 auto;
  padding: 2rem;
  line-height: 1.6;
}

.card {
  background: #f5f5f5;
  padding: 1.5rem;
  border-radius: 8px;
}
"#;

pub(crate) const SEED_SCRIPT_JS: &str = r#"const button = document.getElementById('counter');
let clicks = 0;

button.addEventListener('click', () => {
  clicks += 1;
  button.textContent = `Clicked ${clicks} times`;
});
"#;

/// Initial content for a freshly created file of the given language.
pub fn default_content(language: Language) -> &'static str {
    match language {
        Language::Html => HTML_TEMPLATE,
        Language::Css => CSS_TEMPLATE,
        Language::JavaScript => JS_TEMPLATE,
        _ => "",
    }
}
