//! Earshot Preview - headless audio preview host
//!
//! Resolves a file reference, asks the capability query whether it can be
//! previewed, then runs one preview session and logs the view as it changes.
//!
//! ## Usage
//!
//! ```text
//! earshot-preview [OPTIONS] <PATH | URL>
//! earshot-preview [OPTIONS] --id <FILE_ID> --mime <TYPE> --size <BYTES>
//! ```
//!
//! - `--id <ID>`: preview a server file through the download URL template
//! - `--mime <TYPE>`: MIME type (default: guessed from the extension)
//! - `--size <BYTES>`: file size (default: file metadata for local paths)
//! - `--config <PATH>`: config file (default: ~/.config/earshot/previewer.yaml)
//! - `--play`: start playback once ready and run to the end
//! - `--timeout <SECS>`: give up after this long

mod app;
mod config;
mod registry;
mod renderer;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use earshot_core::config::load_config;

use app::{Outcome, PreviewApp};
use config::PreviewerConfig;
use registry::{guess_mime_type, FileRef, PreviewRegistry};

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Args {
    target: Option<String>,
    id: Option<String>,
    mime: Option<String>,
    size: Option<u64>,
    config: Option<PathBuf>,
    play: bool,
    timeout: Option<Duration>,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut parsed = Args::default();
        let mut iter = args.into_iter();

        while let Some(arg) = iter.next() {
            let mut value = |name: &str| {
                iter.next()
                    .with_context(|| format!("{} needs a value", name))
            };
            match arg.as_str() {
                "--id" => parsed.id = Some(value("--id")?),
                "--mime" => parsed.mime = Some(value("--mime")?),
                "--size" => {
                    let raw = value("--size")?;
                    parsed.size = Some(raw.parse().with_context(|| format!("Invalid size: {}", raw))?);
                }
                "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
                "--timeout" => {
                    let raw = value("--timeout")?;
                    let secs: u64 = raw.parse().with_context(|| format!("Invalid timeout: {}", raw))?;
                    parsed.timeout = Some(Duration::from_secs(secs));
                }
                "--play" => parsed.play = true,
                flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
                _ if parsed.target.is_none() => parsed.target = Some(arg.clone()),
                _ => bail!("Unexpected argument: {}", arg),
            }
        }

        if parsed.target.is_none() && parsed.id.is_none() {
            bail!("Nothing to preview: pass a path, a URL or --id");
        }
        Ok(parsed)
    }

    /// Build the host's file reference
    fn file_ref(&self) -> Result<FileRef> {
        let local = self
            .target
            .as_deref()
            .filter(|t| !t.contains("://") || t.starts_with("file://"))
            .map(|t| PathBuf::from(t.trim_start_matches("file://")));

        let mut file = match (&local, &self.id) {
            (Some(path), None) => FileRef::local(path)
                .with_context(|| format!("Cannot read {}", path.display()))?,
            _ => FileRef {
                id: self.id.clone(),
                link: self.target.clone(),
                mime_type: self
                    .target
                    .as_deref()
                    .and_then(|t| guess_mime_type(Path::new(t)))
                    .unwrap_or("application/octet-stream")
                    .to_string(),
                size: 0,
            },
        };

        if let Some(mime) = &self.mime {
            file.mime_type = mime.clone();
        }
        if let Some(size) = self.size {
            file.size = size;
        }
        Ok(file)
    }
}

fn run() -> Result<bool> {
    let args = Args::parse(std::env::args().skip(1))?;

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let mut config: PreviewerConfig = load_config(&config_path);
    config.autoplay |= args.play;

    let file = args.file_ref()?;
    let descriptor = PreviewRegistry::default()
        .select(&file, &config)
        .context("File cannot be previewed")?;

    let mut app = PreviewApp::new(&config);
    app.open(descriptor);

    match app.run(args.timeout) {
        Outcome::Finished(state) => {
            let readout = app
                .view()
                .player()
                .map(|p| p.time_readout())
                .unwrap_or_default();
            log::info!("Preview finished in {:?} at {}", state.state, readout);
            Ok(true)
        }
        Outcome::Failed(message) => {
            eprintln!("{}", message);
            Ok(false)
        }
        Outcome::TimedOut(state) => {
            eprintln!("Timed out in state {:?}", state.state);
            app.close();
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("earshot-preview {} starting up", env!("CARGO_PKG_VERSION"));

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
