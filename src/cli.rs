// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Render every revision of a web page and keep the visually distinct ones
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the root of the git repository holding the page
    pub repo: PathBuf,

    /// File to render, relative to the repository root
    pub file: PathBuf,

    /// Directory to save the retained PNG frames
    #[arg(short, long, default_value = "montage")]
    pub output: PathBuf,

    /// Width of the browser window in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Height of the browser window in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Chrome or Chromium executable used for headless rendering
    #[arg(long, default_value = "google-chrome")]
    pub browser: PathBuf,

    /// Seconds to wait for a single capture before giving up
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Side length of the perceptual hash grid (fingerprint has hash_size² bits)
    #[arg(long, default_value_t = 8)]
    pub hash_size: u32,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
