use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::detector::backend::Detector;
use crate::detector::frame::{DetectOptions, DetectorOutput};
use crate::prelude::{StageError, StageResult};

const SIDECAR_SUFFIX: &str = "detections.json";

/// Detector that replays output exported by an external model run.
///
/// The export is a JSON `DetectorOutput`. Without an explicit path the
/// detector looks for `<media>.detections.json` next to the media file.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    source: Option<PathBuf>,
}

impl ReplayDetector {
    pub fn new() -> Self {
        Self { source: None }
    }

    pub fn from_file(source: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(source.into()),
        }
    }

    pub fn sidecar_path(media: &Path) -> PathBuf {
        let mut name = media.as_os_str().to_os_string();
        name.push(".");
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }
}

impl Detector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&self, media: &Path, options: &DetectOptions) -> StageResult<DetectorOutput> {
        let source = self
            .source
            .clone()
            .unwrap_or_else(|| Self::sidecar_path(media));
        if !source.exists() {
            return Err(StageError::MissingArtifact(source));
        }

        let contents = fs::read_to_string(&source)?;
        let mut output: DetectorOutput = serde_json::from_str(&contents).map_err(|err| {
            StageError::Detector(format!("parsing {}: {}", source.display(), err))
        })?;

        // Boxes without a confidence are kept so extraction can reject them.
        let floor = options.confidence_floor;
        let mut dropped = 0usize;
        for frame in &mut output.batch.frames {
            let before = frame.boxes.len();
            frame
                .boxes
                .retain(|raw| raw.confidence.map_or(true, |conf| conf >= floor));
            dropped += before - frame.boxes.len();
        }
        debug!(
            "replayed {} frames from {} ({} boxes under floor {:.2})",
            output.batch.frames.len(),
            source.display(),
            dropped,
            floor
        );

        Ok(output)
    }
}
