//! proximity - flag people standing too close, in an image or a frame stream
//!
//! Single-image mode:
//!   proximity --image path/to/img.jpg --backend tract --network pose.onnx
//!   proximity --image path/to/img.jpg --poses img_poses.json
//!   (saves the annotated image to ./result/<name>_result.<ext>)
//!
//! Stream mode:
//!   proximity stub://camera display://0 --distance 150
//!   proximity ./frames_dir display://0 --backend replay --poses poses.jsonl
//!   (logs live status AND records ./result/violence_realtime/)

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pose_proximity::{
    build_registry, check_backend_for_input, open_output, FrameSink, Overlay, Pipeline,
    ProximityConfig, ResultDir, SourceConfig, VideoSource,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "proximity",
    version,
    about = "Measure distance between people using a pose-estimation backend"
)]
struct Args {
    /// Path to an input image (enables single-image mode)
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Input stream (stub://name, a directory of frames, or an image file)
    input: Option<String>,

    /// Primary output (display://0, file://<dir>, or a directory)
    #[arg(default_value = "display://0")]
    output: String,

    /// Pose model name or path (default: resnet18-body)
    #[arg(long)]
    network: Option<String>,

    /// Minimum pose detection confidence (default: 0.15)
    #[arg(long)]
    threshold: Option<f32>,

    /// Absolute distance threshold in pixels (default: 150)
    #[arg(long)]
    distance: Option<f32>,

    /// Relative threshold: distance / average person height (default: 0.7)
    #[arg(long, alias = "rel_threshold")]
    rel_threshold: Option<f32>,

    /// Pose backend (stub|replay|tract)
    #[arg(long)]
    backend: Option<String>,

    /// Recorded detections for the replay backend (JSON or JSON lines)
    #[arg(long, value_name = "FILE")]
    poses: Option<PathBuf>,

    /// Folder for annotated images and recordings (default: ./result)
    #[arg(long, value_name = "DIR")]
    result_dir: Option<PathBuf>,

    /// Stop the stream after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Synthetic frame width for stub:// inputs
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Synthetic frame height for stub:// inputs
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Overlay layers (links,keypoints,centers,pairs,status or none)
    #[arg(long, default_value = "links,keypoints,centers,pairs,status")]
    overlay: String,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = ProximityConfig::load()?;
    apply_args(&mut cfg, &args);
    cfg.validate()?;
    let thresholds = cfg.thresholds()?;
    let overlay = Overlay::parse(&args.overlay)?;

    let input_name = match (&args.image, &args.input) {
        (Some(image), _) => image.display().to_string(),
        (None, Some(input)) => input.clone(),
        (None, None) => {
            return Err(anyhow!(
                "please specify either --image or an input stream URI (e.g. stub://camera)"
            ))
        }
    };
    let explicit_backend = args.backend.is_some()
        || std::env::var("PROXIMITY_BACKEND").is_ok_and(|v| !v.trim().is_empty());
    check_backend_for_input(&cfg.detection, &input_name, explicit_backend)?;

    let registry = build_registry(&cfg.detection, args.poses.as_deref())?;
    let pipeline = Pipeline::new(registry, thresholds).with_overlay(overlay);

    if let Some(image) = &args.image {
        let ui = ui::Ui::from_args(
            &args.ui,
            std::io::stderr().is_terminal(),
            !std::io::stdout().is_terminal(),
        );
        let results = {
            let _stage = ui.stage("Create result folder");
            ResultDir::create(&cfg.output.result_dir)?
        };
        let outcome = {
            let _stage = ui.stage("Score image");
            pipeline.run_image(image, &results)?
        };
        println!("{}: {}", image.display(), outcome.report.status_line());
        println!("annotated image: {}", outcome.output_path.display());
        return Ok(());
    }

    log::info!("Realtime mode from input='{}' to output='{}'", input_name, args.output);

    let mut source = VideoSource::new(SourceConfig {
        uri: input_name,
        width: args.width,
        height: args.height,
        max_frames: args.max_frames,
    })?;
    source.connect()?;

    let mut display_out = open_output(&args.output)?;
    let results = ResultDir::create(&cfg.output.result_dir)?;
    let mut record_out = results.recording(&cfg.output.record_name)?;
    log::info!("Recording annotated frames to: {}", record_out.dir().display());

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let record_dir = record_out.dir().to_path_buf();
    let mut sinks: [&mut dyn FrameSink; 2] = [display_out.as_mut(), &mut record_out];
    let summary = pipeline.run_stream(&mut source, &mut sinks, &stop)?;

    println!("proximity summary:");
    println!("  frames processed: {}", summary.frames);
    println!("  frames with violations: {}", summary.violation_frames);
    println!("  most people in one frame: {}", summary.max_people);
    println!("  recording: {}", record_dir.display());
    if summary.interrupted {
        println!("  stopped by Ctrl-C");
    }
    Ok(())
}

fn apply_args(cfg: &mut ProximityConfig, args: &Args) {
    if let Some(distance) = args.distance {
        cfg.distance = distance;
    }
    if let Some(rel) = args.rel_threshold {
        cfg.rel_threshold = rel;
    }
    if let Some(threshold) = args.threshold {
        cfg.detection.min_confidence = threshold;
    }
    if let Some(network) = &args.network {
        cfg.detection.network = network.clone();
    }
    if let Some(backend) = &args.backend {
        cfg.detection.backend = backend.clone();
    } else if args.poses.is_some() {
        cfg.detection.backend = "replay".to_string();
    }
    if let Some(dir) = &args.result_dir {
        cfg.output.result_dir = dir.clone();
    }
}
