use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use playbox::locations::default_log_dir;
use playbox::log::init_logging;
use playbox::vfsio::load_directory;
use playbox::{PlaygroundConfig, PreviewEngine, PreviewWarning, Result, Workspace};

// Allow the tool to return its version with a --version flag
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
struct Opts {
    /// Project directory to load. Without it the starter project is used.
    dir: Option<PathBuf>,
    #[clap(short, long)]
    version: bool,
    #[clap(short, long)]
    debug: bool,
    /// HTML file to preview, as an absolute tree path or relative to the root.
    #[clap(short, long)]
    entry: Option<String>,
    /// Write the document here instead of stdout.
    #[clap(short, long)]
    out: Option<PathBuf>,
    /// Print the dependency and warning report as JSON instead of the document.
    #[clap(short, long)]
    report: bool,
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Write JSON logs to this directory. `--log-dir default` picks the user
    /// data directory.
    #[clap(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    entry: Option<String>,
    dependencies: &'a [String],
    warnings: &'a [PreviewWarning],
    fell_back: bool,
}

fn main() -> ExitCode {
    let opts: Opts = Opts::parse();
    if opts.version {
        println!("{}", VERSION);
        return ExitCode::SUCCESS;
    }

    let log_dir = match opts.log_dir.as_deref() {
        Some(dir) if dir.as_os_str() == "default" => match default_log_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        other => other.map(PathBuf::from),
    };
    let _guard = match init_logging(log_dir.as_deref(), opts.debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Opts) -> Result<()> {
    let config = match &opts.config {
        Some(path) => PlaygroundConfig::from_file(path)?,
        None => PlaygroundConfig::default(),
    };

    let mut workspace = match &opts.dir {
        Some(dir) => load_directory(dir, &config)?,
        None => Workspace::new(&config)?,
    };
    if let Some(entry) = &opts.entry {
        select_entry(&mut workspace, entry)?;
    }

    let mut engine = PreviewEngine::from_config(&config);
    let entry = workspace.preview_source().map(|s| s.path);
    let output = engine.render(&workspace);

    let text = if opts.report {
        let report = Report {
            entry,
            dependencies: &output.dependencies,
            warnings: &output.warnings,
            fell_back: output.fell_back,
        };
        serde_json::to_string_pretty(&report)?
    } else {
        output.html.clone()
    };

    match &opts.out {
        Some(path) => std::fs::write(path, text)?,
        None => println!("{}", text),
    }
    Ok(())
}

fn select_entry(workspace: &mut Workspace, entry: &str) -> Result<()> {
    let path = if entry.starts_with('/') {
        entry.to_string()
    } else {
        format!("{}/{}", workspace.tree().root().path, entry.trim_start_matches("./"))
    };
    let id = workspace
        .node_at(&path)
        .map(|n| n.id)
        .ok_or_else(|| playbox::PlaygroundError::not_found("Entry file", &path))?;
    workspace.set_active_file(id)
}
