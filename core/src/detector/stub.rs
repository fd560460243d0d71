use std::path::{Path, PathBuf};

use crate::detector::backend::Detector;
use crate::detector::frame::{DetectOptions, DetectionBatch, DetectorOutput};
use crate::prelude::StageResult;

/// Detector double that replays a fixed batch for any media.
///
/// The annotated media defaults to the input path.
#[derive(Debug, Clone, Default)]
pub struct StubDetector {
    batch: DetectionBatch,
    annotated_media: Option<PathBuf>,
    preview_image: Option<PathBuf>,
}

impl StubDetector {
    pub fn new(batch: DetectionBatch) -> Self {
        Self {
            batch,
            annotated_media: None,
            preview_image: None,
        }
    }

    pub fn with_annotated_media(mut self, path: impl Into<PathBuf>) -> Self {
        self.annotated_media = Some(path.into());
        self
    }

    pub fn with_preview_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.preview_image = Some(path.into());
        self
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&self, media: &Path, _options: &DetectOptions) -> StageResult<DetectorOutput> {
        Ok(DetectorOutput {
            annotated_media: self
                .annotated_media
                .clone()
                .unwrap_or_else(|| media.to_path_buf()),
            preview_image: self.preview_image.clone(),
            batch: self.batch.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::frame::{ClassNames, FrameResult, RawBox};

    #[test]
    fn stub_returns_its_batch_for_any_media() {
        let names: ClassNames = [(0, "pothole")].into_iter().collect();
        let batch = DetectionBatch::new(
            names,
            vec![FrameResult::new(vec![RawBox::new(0, 0.5, [0.0, 0.0, 10.0, 10.0])])],
        );
        let detector = StubDetector::new(batch.clone());

        let output = detector
            .detect(Path::new("road.jpg"), &DetectOptions::default())
            .unwrap();
        assert_eq!(output.batch, batch);
        assert_eq!(output.annotated_media, PathBuf::from("road.jpg"));
        assert!(output.preview_image.is_none());
    }
}
