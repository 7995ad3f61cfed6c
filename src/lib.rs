pub mod best_mapping;
pub mod heatmap;
pub mod kaldi_io;
pub mod linalg;
pub mod pdf;
pub mod scatter;
pub mod tables;

use eyre::{Result, WrapErr};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn open_text<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`), so stdout
/// only carries program output.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
