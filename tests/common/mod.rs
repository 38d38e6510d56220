/*!
 * Common test utilities for the ttcaptions test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tempfile::TempDir;

use ttcaptions::player::{CaptionRenderer, FrameGeometry, Placement, VideoSurface};

/// Three cues: two simultaneous speakers, then a two-line caption
pub const SAMPLE_TTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tt xmlns="http://www.w3.org/ns/ttml"
    xmlns:ttp="http://www.w3.org/ns/ttml#parameter"
    xmlns:tts="http://www.w3.org/ns/ttml#styling"
    ttp:frameRate="30" ttp:dropMode="nonDrop">
  <body>
    <div>
      <p begin="00:00:01:00" end="00:00:03:00" tts:origin="10% 70%">First speaker</p>
      <p begin="00:00:01:00" end="00:00:03:00" tts:origin="10% 75%">Second speaker</p>
      <p begin="00:00:04:00" end="00:00:06:00">Line one<br/>Line two</p>
    </div>
  </body>
</tt>
"#;

/// Wrap cue elements in a tt document with the given root attributes
pub fn ttml_document(root_attributes: &str, cues: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<tt xmlns="http://www.w3.org/ns/ttml" xmlns:ttp="http://www.w3.org/ns/ttml#parameter" xmlns:tts="http://www.w3.org/ns/ttml#styling" {}>
  <body><div>
{}
  </div></body>
</tt>"#,
        root_attributes, cues
    )
}

/// Route library logs to the test harness output
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Surface whose position is set by the test
#[derive(Debug, Default)]
pub struct ManualSurface {
    position: AtomicU64,
    geometry: FrameGeometry,
}

impl ManualSurface {
    pub fn new(geometry: FrameGeometry) -> Self {
        ManualSurface {
            position: AtomicU64::new(0),
            geometry,
        }
    }

    pub fn seek(&self, position_ms: u64) {
        self.position.store(position_ms, Ordering::SeqCst);
    }
}

impl VideoSurface for ManualSurface {
    fn position_ms(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }
}

/// A call received by the recording renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Show { region: usize, text: String, placement: Placement },
    Hide { region: usize },
}

/// Renderer remembering every call, shareable with the test body
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    regions: usize,
    pub calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn new(regions: usize) -> Self {
        RecordingRenderer {
            regions,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn take_calls(&self) -> Vec<RenderCall> {
        std::mem::take(&mut *self.calls.lock())
    }
}

impl CaptionRenderer for RecordingRenderer {
    fn region_count(&self) -> usize {
        self.regions
    }

    fn show(&mut self, region: usize, text: &str, placement: Placement) {
        self.calls.lock().push(RenderCall::Show {
            region,
            text: text.to_string(),
            placement,
        });
    }

    fn hide(&mut self, region: usize) {
        self.calls.lock().push(RenderCall::Hide { region });
    }
}
