// Materializing turns processed text into something a rewritten import can
// point at. Every reference handed out belongs to one render and is released
// once the next render supersedes it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const CSS_MIME: &str = "text/css";
pub const JS_MIME: &str = "text/javascript";

const BLOB_PREFIX: &str = "blob:playbox/";

/// How materialized dependencies are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializeMode {
    /// Self-contained `data:` URLs; nothing needs to be served.
    #[default]
    DataUrl,
    /// `blob:` handles the host serves from a [`BlobRegistry`].
    Blob,
}

pub trait Materializer {
    /// Stores `content` and returns a URL that refers to it.
    fn materialize(&mut self, path: &str, mime: &str, content: &str) -> String;

    /// Forgets references handed out by an earlier render.
    fn release(&mut self, urls: &[String]);

    /// Number of references currently held.
    fn live_count(&self) -> usize;

    /// Content behind a reference, when the materializer keeps it.
    fn resolve(&self, _url: &str) -> Option<&MaterializedResource> {
        None
    }
}

pub fn build_materializer(mode: MaterializeMode) -> Box<dyn Materializer> {
    match mode {
        MaterializeMode::DataUrl => Box::new(DataUrlMaterializer::default()),
        MaterializeMode::Blob => Box::new(BlobRegistry::default()),
    }
}

/// Encodes content into `data:<mime>;base64,...` URLs.
#[derive(Debug, Default)]
pub struct DataUrlMaterializer {
    live: usize,
}

impl Materializer for DataUrlMaterializer {
    fn materialize(&mut self, _path: &str, mime: &str, content: &str) -> String {
        self.live += 1;
        format!("data:{};base64,{}", mime, STANDARD.encode(content.as_bytes()))
    }

    fn release(&mut self, urls: &[String]) {
        self.live = self.live.saturating_sub(urls.len());
    }

    fn live_count(&self) -> usize {
        self.live
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedResource {
    /// Absolute VFS path the content was produced from.
    pub source_path: String,
    pub mime: String,
    pub content: String,
}

/// Keeps materialized content in memory behind `blob:playbox/<uuid>` handles.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    entries: HashMap<String, MaterializedResource>,
}

impl BlobRegistry {
    pub fn get(&self, url: &str) -> Option<&MaterializedResource> {
        self.entries.get(url)
    }
}

impl Materializer for BlobRegistry {
    fn materialize(&mut self, path: &str, mime: &str, content: &str) -> String {
        let url = format!("{}{}", BLOB_PREFIX, Uuid::new_v4().simple());
        self.entries.insert(
            url.clone(),
            MaterializedResource {
                source_path: path.to_string(),
                mime: mime.to_string(),
                content: content.to_string(),
            },
        );
        url
    }

    fn release(&mut self, urls: &[String]) {
        for url in urls {
            self.entries.remove(url);
        }
    }

    fn live_count(&self) -> usize {
        self.entries.len()
    }

    fn resolve(&self, url: &str) -> Option<&MaterializedResource> {
        self.get(url)
    }
}

/// Decodes a `data:...;base64,` URL produced by [`DataUrlMaterializer`].
pub fn decode_data_url(url: &str) -> Option<String> {
    let (_, payload) = url.strip_prefix("data:")?.split_once(";base64,")?;
    let bytes = STANDARD.decode(payload).ok()?;
    String::from_utf8(bytes).ok()
}
