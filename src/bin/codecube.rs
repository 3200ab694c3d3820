//! # codecube
//!
//! Opens a scannable-code image in the 3D viewer.
//!
//! ## Usage:
//! ```bash
//! codecube path/to/code.png [export-dir]
//! ```
//!
//! Without an image the placeholder card is shown. Environment overrides
//! such as `CODECUBE_FORCE_DEGRADED=1` are read at startup; `RUST_LOG`
//! controls logging.
//!
//! ## Keys:
//! - Arrows: tilt, `+`/`-`: scale, P: play/pause
//! - S: settings panel, D: save a PNG snapshot, Shift+C: reset camera
//! - Esc: quit

use std::path::PathBuf;

use anyhow::{Context, Result};
use codecube::{CodeCubeApp, EngineConfig, FileSource, ImageSource};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args_os().skip(1);
    let source = args
        .next()
        .map(|path| Box::new(FileSource::new(PathBuf::from(path))) as Box<dyn ImageSource>);
    let export_dir = match args.next() {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("cannot resolve the working directory")?,
    };

    let config = EngineConfig::from_env();
    log::info!("starting codecube with {config:?}");

    let app = CodeCubeApp::new(config, source, export_dir).context("failed to create event loop")?;
    app.run().context("event loop terminated with an error")?;
    Ok(())
}
