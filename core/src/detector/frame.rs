use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Class-id to damage-type mapping published by the model.
///
/// Shared by every frame of one detector invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNames(BTreeMap<usize, String>);

impl ClassNames {
    pub fn resolve(&self, class_id: usize) -> Option<&str> {
        self.0.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for ClassNames {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, name)| (id, name.into())).collect())
    }
}

/// One raw box as the detector reports it.
///
/// Every field is optional on the wire so that incomplete detector output is
/// surfaced as a typed extraction error instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBox {
    #[serde(default, alias = "cls")]
    pub class_id: Option<usize>,
    #[serde(default, alias = "conf")]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub xyxy: Option<Vec<f32>>,
}

impl RawBox {
    pub fn new(class_id: usize, confidence: f32, xyxy: [f32; 4]) -> Self {
        Self {
            class_id: Some(class_id),
            confidence: Some(confidence),
            xyxy: Some(xyxy.to_vec()),
        }
    }
}

/// Detector output for a single image or a single video frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    #[serde(default)]
    pub boxes: Vec<RawBox>,
}

impl FrameResult {
    pub fn new(boxes: Vec<RawBox>) -> Self {
        Self { boxes }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Ordered per-frame results plus the class mapping they share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    pub names: ClassNames,
    #[serde(default)]
    pub frames: Vec<FrameResult>,
}

impl DetectionBatch {
    pub fn new(names: ClassNames, frames: Vec<FrameResult>) -> Self {
        Self { names, frames }
    }

    pub fn box_count(&self) -> usize {
        self.frames.iter().map(|frame| frame.boxes.len()).sum()
    }
}

/// Everything a detector hands back for one media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorOutput {
    /// Media with the detections drawn on it (image or video).
    pub annotated_media: PathBuf,
    /// Still image suitable for embedding in the report, when the annotated
    /// media is itself not one.
    #[serde(default)]
    pub preview_image: Option<PathBuf>,
    pub batch: DetectionBatch,
}

/// Options forwarded untouched to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectOptions {
    pub confidence_floor: f32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            confidence_floor: 0.25,
        }
    }
}
