//! score_poses - classify recorded pose detections without images
//!
//! Reads persons as JSON (one frame) or JSON lines (one frame per line) from a
//! file or stdin and prints one frame report per line on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{Read, Write};
use std::path::PathBuf;

use pose_proximity::pose::parse_pose_frames;
use pose_proximity::report::log_report;
use pose_proximity::{classify, FrameReport, ProximityConfig, Verdict};

#[derive(Parser, Debug)]
#[command(
    name = "score_poses",
    about = "Score recorded pose detections against the proximity thresholds"
)]
struct Args {
    /// Recorded detections (reads stdin when omitted or "-")
    input: Option<PathBuf>,

    /// Absolute distance threshold in pixels
    #[arg(long)]
    distance: Option<f32>,

    /// Relative threshold: distance / average person height
    #[arg(long, alias = "rel_threshold")]
    rel_threshold: Option<f32>,

    /// Exit with status 2 when any frame is a violation
    #[arg(long)]
    fail_on_violation: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut cfg = ProximityConfig::load()?;
    if let Some(distance) = args.distance {
        cfg.distance = distance;
    }
    if let Some(rel) = args.rel_threshold {
        cfg.rel_threshold = rel;
    }
    cfg.validate()?;
    let thresholds = cfg.thresholds()?;

    let raw = match args.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    let frames = parse_pose_frames(&raw)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut violations = 0usize;
    for (index, persons) in frames.iter().enumerate() {
        let report = FrameReport::new(index as u64, thresholds, classify(persons, &thresholds));
        log_report(&report);
        if report.verdict() == Verdict::Violation {
            violations += 1;
        }
        writeln!(out, "{}", report.to_json_line()?)?;
    }
    out.flush()?;
    log::info!("{} frame(s) scored, {} with violations", frames.len(), violations);

    if args.fail_on_violation && violations > 0 {
        std::process::exit(2);
    }
    Ok(())
}
