// src/logging.rs

use env_logger::{Builder, Env};
use log::{error, LevelFilter};
use std::path::Path;

/// Environment variable overriding the verbosity flags
pub const LOG_ENV: &str = "MONTAGE_LOG";

pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize the logger. `MONTAGE_LOG` wins over the `-v` count.
pub fn init_logger(verbose: u8) -> Result<(), log::SetLoggerError> {
    let default = level_for(verbose).to_string().to_lowercase();
    Builder::from_env(Env::default().filter_or(LOG_ENV, default))
        .format_timestamp_secs()
        .format_module_path(false)
        .try_init()
}

/// Log a revision that could not be processed
pub fn log_revision_error(revision: &str, file: &Path, error: &dyn std::error::Error) {
    error!(
        "Revision failed - Revision: {}, File: {}, Error: {}",
        revision,
        file.display(),
        error
    );
}
