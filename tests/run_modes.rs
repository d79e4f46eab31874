//! End-to-end runs of the single-image and stream modes against temporary folders.

use std::io::Write;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use pose_proximity::config::DetectionSettings;
use pose_proximity::output::REPORT_FILE_NAME;
use pose_proximity::{
    build_registry, check_backend_for_input, Frame, ProximityConfig, FrameSink, MemorySink, Pipeline, ResultDir, SourceConfig, Thresholds,
    Verdict, VideoSource,
};

fn detection(backend: &str) -> DetectionSettings {
    DetectionSettings {
        backend: backend.to_string(),
        network: "resnet18-body".to_string(),
        min_confidence: 0.15,
    }
}

/// Two people with hips `gap` pixels apart and 400 px tall, as one JSON line.
fn pose_line(gap: f32) -> String {
    let person = |cx: f32| {
        format!(
            r#"{{"keypoints": [
                {{"joint": "nose", "x": {cx}, "y": 100, "confidence": 0.9}},
                {{"joint": "left_hip", "x": {lx}, "y": 300, "confidence": 0.9}},
                {{"joint": "right_hip", "x": {rx}, "y": 300, "confidence": 0.9}},
                {{"joint": "left_ankle", "x": {cx}, "y": 500, "confidence": 0.9}}
            ]}}"#,
            cx = cx,
            lx = cx + 10.0,
            rx = cx - 10.0
        )
        .replace('\n', " ")
    };
    format!("[{}, {}]", person(100.0), person(100.0 + gap))
}

#[test]
fn single_image_is_scored_and_saved_with_result_suffix() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("street.png");
    Frame::filled(0, 640, 480, [30, 30, 30]).image().save(&input)?;

    let registry = build_registry(&detection("stub"), None)?;
    let pipeline = Pipeline::new(registry, Thresholds::default());
    let results = ResultDir::create(dir.path().join("result"))?;

    let outcome = pipeline.run_image(&input, &results)?;
    assert_eq!(outcome.output_path, dir.path().join("result").join("street_result.png"));
    assert!(outcome.output_path.is_file());
    assert_eq!(outcome.report.people(), 2);
    // the stub scene starts with both people far apart
    assert_eq!(outcome.report.verdict(), Verdict::Safe);

    let annotated = image::open(&outcome.output_path)?.to_rgb8();
    assert_ne!(annotated.get_pixel(5, 5).0, [30, 30, 30], "status banner drawn");
    Ok(())
}

#[test]
fn replayed_detections_drive_the_verdict_per_frame() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let poses = dir.path().join("poses.jsonl");
    let mut file = std::fs::File::create(&poses)?;
    writeln!(file, "{}", pose_line(100.0))?; // abs + rel
    writeln!(file, "{}", pose_line(250.0))?; // rel only: 250 / 400 = 0.625
    writeln!(file, "{}", pose_line(500.0))?; // safe: 1.25
    drop(file);

    let registry = build_registry(&detection("replay"), Some(&poses))?;
    let pipeline = Pipeline::new(registry, Thresholds::new(150.0, 0.7)?);
    let mut source = VideoSource::new(SourceConfig {
        uri: "stub://replay".to_string(),
        max_frames: Some(3),
        ..SourceConfig::default()
    })?;
    source.connect()?;

    let mut sink = MemorySink::new();
    let stop = AtomicBool::new(false);
    let mut sinks: [&mut dyn FrameSink; 1] = [&mut sink];
    let summary = pipeline.run_stream(&mut source, &mut sinks, &stop)?;

    assert_eq!(summary.frames, 3);
    assert_eq!(summary.violation_frames, 2);
    let verdicts: Vec<Verdict> = sink.reports.iter().map(|r| r.verdict()).collect();
    assert_eq!(verdicts, vec![Verdict::Violation, Verdict::Violation, Verdict::Safe]);

    let second = &sink.reports[1].proximity.pairs[0];
    assert!(!second.absolute_violation);
    assert!(second.relative_violation);
    Ok(())
}

#[test]
fn stream_recording_writes_frames_and_report_lines() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = build_registry(&detection("stub"), None)?;
    let pipeline = Pipeline::new(registry, Thresholds::default());
    let results = ResultDir::create(dir.path())?;
    let mut recording = results.recording("violence_realtime")?;
    let mut source = VideoSource::new(SourceConfig {
        uri: "stub://camera".to_string(),
        width: 160,
        height: 120,
        max_frames: Some(4),
    })?;
    source.connect()?;

    let stop = AtomicBool::new(false);
    let mut sinks: [&mut dyn FrameSink; 1] = [&mut recording];
    let summary = pipeline.run_stream(&mut source, &mut sinks, &stop)?;
    assert_eq!(summary.frames, 4);

    let record_dir = dir.path().join("violence_realtime");
    for index in 0..4 {
        assert!(record_dir.join(format!("frame_{:06}.png", index)).is_file());
    }
    let report = std::fs::read_to_string(record_dir.join(REPORT_FILE_NAME))?;
    let lines: Vec<serde_json::Value> = report
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3]["frame"], 3);
    assert_eq!(lines[0]["verdict"]["people"], 2);
    Ok(())
}

#[test]
fn unknown_backend_and_missing_recording_are_errors() {
    assert!(build_registry(&detection("openpose"), None).is_err());
    assert!(build_registry(&detection("replay"), None).is_err());
}

#[test]
fn default_stub_backend_is_refused_for_real_images() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let photo = dir.path().join("empty_room.png");
    Frame::filled(0, 640, 480, [255, 255, 255]).image().save(&photo)?;
    let photo = photo.display().to_string();

    let defaults = ProximityConfig::default();
    assert_eq!(defaults.detection.backend, "stub");
    let err = check_backend_for_input(&defaults.detection, &photo, false).unwrap_err();
    assert!(err.to_string().contains("empty_room.png"));
    assert!(check_backend_for_input(&defaults.detection, "./frames", false).is_err());

    // synthetic streams and an explicit --backend stub are fine
    check_backend_for_input(&defaults.detection, "stub://camera", false)?;
    check_backend_for_input(&defaults.detection, &photo, true)?;
    check_backend_for_input(&detection("replay"), &photo, false)?;
    Ok(())
}
