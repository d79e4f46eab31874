//! Output sinks.
//!
//! Everything that touches the filesystem on the output side lives here:
//! creating the result folder, naming annotated images, and recording
//! annotated streams. The classifier and the pipeline only see the
//! `FrameSink` trait and a `ResultDir` handed to them.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::frame::Frame;
use crate::proximity::Verdict;
use crate::report::FrameReport;

pub const REPORT_FILE_NAME: &str = "report.jsonl";

/// Result folder for annotated images and recordings.
#[derive(Clone, Debug)]
pub struct ResultDir {
    root: PathBuf,
}

impl ResultDir {
    /// Create the folder (and parents) if missing.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create result folder {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `<root>/<stem>_result<.ext>`; inputs without an extension are saved as PNG.
    pub fn annotated_image_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image");
        let ext = input
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("png");
        self.root.join(format!("{}_result.{}", stem, ext))
    }

    /// Save the annotated version of `input`, returning the path written.
    pub fn save_annotated(&self, input: &Path, image: &RgbImage) -> Result<PathBuf> {
        let out_path = self.annotated_image_path(input);
        image
            .save(&out_path)
            .with_context(|| format!("failed to save annotated image {}", out_path.display()))?;
        Ok(out_path)
    }

    /// Open a recording sink in `<root>/<name>/`.
    pub fn recording(&self, name: &str) -> Result<RecordingSink> {
        RecordingSink::create(self.root.join(name))
    }
}

/// Consumer of annotated frames and their reports.
pub trait FrameSink {
    fn name(&self) -> &str;

    fn render(&mut self, frame: &Frame, report: &FrameReport) -> Result<()>;

    /// False once the sink can no longer accept frames.
    fn is_streaming(&self) -> bool {
        true
    }

    /// Flush buffered output.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Open a sink for an output URI.
///
/// - `display://N`: `StatusSink` (no window; the status line goes to the log)
/// - `file://<dir>` or a plain path: `RecordingSink` writing into that directory
pub fn open_output(uri: &str) -> Result<Box<dyn FrameSink>> {
    if let Some(display) = uri.strip_prefix("display://") {
        return Ok(Box::new(StatusSink::new(format!("display-{}", display))));
    }
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    if path.is_empty() || path.contains("://") {
        return Err(anyhow!("unsupported output '{}'", uri));
    }
    Ok(Box::new(RecordingSink::create(path)?))
}

// ----------------------------------------------------------------------------
// RecordingSink: annotated frame sequence + report.jsonl
// ----------------------------------------------------------------------------

/// Records annotated frames as `frame_NNNNNN.png` next to a `report.jsonl`
/// holding one `FrameReport` per line.
pub struct RecordingSink {
    dir: PathBuf,
    report: BufWriter<File>,
    frames_written: u64,
}

impl RecordingSink {
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create recording folder {}", dir.display()))?;
        let report_path = dir.join(REPORT_FILE_NAME);
        let report = File::create(&report_path)
            .with_context(|| format!("failed to create {}", report_path.display()))?;
        Ok(Self {
            dir,
            report: BufWriter::new(report),
            frames_written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", index))
    }
}

impl FrameSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn render(&mut self, frame: &Frame, report: &FrameReport) -> Result<()> {
        let path = self.frame_path(frame.index);
        frame
            .image()
            .save(&path)
            .with_context(|| format!("failed to write frame {}", path.display()))?;
        let line = report.to_json_line()?;
        writeln!(self.report, "{}", line).context("failed to append frame report")?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.report.flush().context("failed to flush frame reports")?;
        log::info!(
            "recording: {} frame(s) written to {}",
            self.frames_written,
            self.dir.display()
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// StatusSink: display stand-in
// ----------------------------------------------------------------------------

/// Logs the status line instead of showing a window. Verdict changes log at
/// `info`, every frame at `debug`.
pub struct StatusSink {
    name: String,
    last_verdict: Option<Verdict>,
}

impl StatusSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_verdict: None,
        }
    }
}

impl FrameSink for StatusSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&mut self, frame: &Frame, report: &FrameReport) -> Result<()> {
        let verdict = report.verdict();
        if self.last_verdict != Some(verdict) {
            log::info!("{}: frame {} {}", self.name, frame.index, report.status_line());
            self.last_verdict = Some(verdict);
        } else {
            log::debug!("{}: frame {} {}", self.name, frame.index, report.status_line());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// MemorySink: keeps everything, for tests and embedding
// ----------------------------------------------------------------------------

/// Keeps reports in memory. Stops streaming after `limit` frames when a
/// limit is set.
#[derive(Default)]
pub struct MemorySink {
    pub reports: Vec<FrameReport>,
    limit: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl FrameSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn render(&mut self, _frame: &Frame, report: &FrameReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.limit.map_or(true, |limit| self.reports.len() < limit)
    }
}
