// src/main.rs

use chrono::TimeZone;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use web_montage::cli::Args;
use web_montage::{export, logging, MontageConfig, Pipeline};

fn rfc2822(timestamp: i64) -> String {
    chrono::Utc
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|t| t.to_rfc2822())
        .unwrap_or_else(|| timestamp.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init_logger(args.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    let start_time = Instant::now();

    let mut pipeline = Pipeline::new(MontageConfig::from(&args));
    let outcome = pipeline.run_git();

    let history = outcome.history();
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        println!(
            "{} revisions of {} span from {} to {}.",
            history.len(),
            args.file.display(),
            rfc2822(first.timestamp),
            rfc2822(last.timestamp)
        );
    }
    println!(
        "Rendering finished in {:.2?}. Kept {} distinct frames.",
        start_time.elapsed(),
        outcome.images().len()
    );

    let code = match export::save_outcome(outcome, &args.output) {
        Ok(frames) => {
            println!("Saved {} frames to {}.", frames.len(), args.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    };

    println!("Total time: {:.2?}", start_time.elapsed());
    code
}
