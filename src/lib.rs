//! In-memory file tree and live preview engine for a browser-style code
//! playground.
//!
//! A [`Workspace`] holds the session's files as immutable snapshots. The
//! [`PreviewEngine`] turns the workspace's HTML entry point into one
//! self-contained document by inlining local stylesheets and scripts and
//! rewriting their nested imports.

pub mod config;
pub mod errors;
pub mod locations;
pub mod log;
pub mod preview;
pub mod vfs;
pub mod vfsio;

pub use config::PlaygroundConfig;
pub use errors::{ErrorType, PlaygroundError, Result};
pub use preview::{PreviewEngine, PreviewOutput, PreviewWarning};
pub use vfs::Workspace;
