use damagecore::detector::{
    ClassNames, DetectOptions, DetectionBatch, Detector, DetectorOutput, FrameResult, RawBox,
};
use damagecore::prelude::{StageError, StageResult};
use image::{Rgb, RgbImage};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CANVAS: Rgb<u8> = Rgb([96, 96, 96]);
const OUTLINE: Rgb<u8> = Rgb([255, 64, 64]);
const OUTLINE_WIDTH: u32 = 3;

/// Configuration for generating synthetic detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub frames: usize,
    pub max_boxes: usize,
    /// Chance that a frame comes back with no boxes at all.
    pub empty_frame_ratio: f32,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub class_names: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            frames: 1,
            max_boxes: 4,
            empty_frame_ratio: 0.25,
            width: 1280,
            height: 720,
            seed: 0,
            class_names: vec![
                "longitudinal crack".into(),
                "transverse crack".into(),
                "alligator crack".into(),
                "pothole".into(),
            ],
        }
    }
}

impl GeneratorConfig {
    fn normalized_frames(&self) -> usize {
        self.frames.max(1)
    }

    fn normalized_size(&self) -> (u32, u32) {
        (self.width.max(32), self.height.max(32))
    }

    fn names(&self) -> ClassNames {
        self.class_names.iter().cloned().enumerate().collect()
    }
}

/// Seeded stand-in for the road-damage model.
///
/// Every call reseeds, so the same media and options always produce the same
/// frames. The first frame with boxes is drawn into a preview PNG inside
/// `preview_dir`.
pub struct SyntheticDetector {
    config: GeneratorConfig,
    preview_dir: PathBuf,
}

impl SyntheticDetector {
    pub fn new(config: GeneratorConfig, preview_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            preview_dir: preview_dir.into(),
        }
    }

    pub fn generate_batch(&self, options: &DetectOptions) -> DetectionBatch {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let names = self.config.names();
        let frames = (0..self.config.normalized_frames())
            .map(|_| self.generate_frame(&mut rng, options.confidence_floor, &names))
            .collect();
        DetectionBatch::new(names, frames)
    }

    fn generate_frame(&self, rng: &mut StdRng, floor: f32, names: &ClassNames) -> FrameResult {
        if names.is_empty() || rng.gen::<f32>() < self.config.empty_frame_ratio {
            return FrameResult::empty();
        }

        let (width, height) = self.config.normalized_size();
        let floor = floor.clamp(0.0, 1.0);
        let count = rng.gen_range(1..=self.config.max_boxes.max(1));
        let boxes = (0..count)
            .map(|_| {
                let class_id = rng.gen_range(0..names.len());
                let confidence = if floor < 1.0 {
                    rng.gen_range(floor..1.0)
                } else {
                    1.0
                };
                let box_width = rng.gen_range(8..=width / 2) as f32;
                let box_height = rng.gen_range(8..=height / 2) as f32;
                let x1 = rng.gen_range(0.0..(width as f32 - box_width));
                let y1 = rng.gen_range(0.0..(height as f32 - box_height));
                RawBox::new(
                    class_id,
                    confidence,
                    [x1, y1, x1 + box_width, y1 + box_height],
                )
            })
            .collect();
        FrameResult::new(boxes)
    }

    fn render_preview(&self, media: &Path, batch: &DetectionBatch) -> StageResult<PathBuf> {
        let (width, height) = self.config.normalized_size();
        let mut canvas = RgbImage::from_pixel(width, height, CANVAS);
        if let Some(frame) = batch.frames.iter().find(|frame| !frame.boxes.is_empty()) {
            for raw in &frame.boxes {
                let corners = raw
                    .xyxy
                    .as_deref()
                    .and_then(|coords| <[f32; 4]>::try_from(coords).ok());
                if let Some([x1, y1, x2, y2]) = corners {
                    outline(&mut canvas, x1 as u32, y1 as u32, x2 as u32, y2 as u32);
                }
            }
        }

        let stem = media
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("media");
        std::fs::create_dir_all(&self.preview_dir)?;
        let path = self.preview_dir.join(format!("{stem}_annotated.png"));
        canvas
            .save(&path)
            .map_err(|err| StageError::Detector(format!("writing preview: {err}")))?;
        Ok(path)
    }
}

impl Detector for SyntheticDetector {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn detect(&self, media: &Path, options: &DetectOptions) -> StageResult<DetectorOutput> {
        let batch = self.generate_batch(options);
        debug!(
            "generated {} frames with {} boxes (seed {})",
            batch.frames.len(),
            batch.box_count(),
            self.config.seed
        );
        let annotated_media = self.render_preview(media, &batch)?;
        Ok(DetectorOutput {
            annotated_media,
            preview_image: None,
            batch,
        })
    }
}

fn outline(canvas: &mut RgbImage, x1: u32, y1: u32, x2: u32, y2: u32) {
    let x2 = x2.min(canvas.width() - 1);
    let y2 = y2.min(canvas.height() - 1);
    for x in x1..=x2 {
        for y in y1..=y2 {
            let on_edge = x < x1 + OUTLINE_WIDTH
                || x + OUTLINE_WIDTH > x2
                || y < y1 + OUTLINE_WIDTH
                || y + OUTLINE_WIDTH > y2;
            if on_edge {
                canvas.put_pixel(x, y, OUTLINE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generator_builds_requested_frame_count() {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            frames: 12,
            seed: 7,
            ..Default::default()
        };
        let detector = SyntheticDetector::new(config, dir.path());
        let output = detector
            .detect(Path::new("drive.mp4"), &DetectOptions::default())
            .unwrap();

        assert_eq!(output.batch.frames.len(), 12);
        assert_eq!(output.batch.names.len(), 4);
        assert!(output.annotated_media.exists());
    }

    #[test]
    fn generated_boxes_respect_floor_and_canvas() {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            frames: 20,
            empty_frame_ratio: 0.0,
            seed: 3,
            ..Default::default()
        };
        let detector = SyntheticDetector::new(config.clone(), dir.path());
        let options = DetectOptions {
            confidence_floor: 0.4,
        };
        let batch = detector.generate_batch(&options);

        for raw in batch.frames.iter().flat_map(|frame| &frame.boxes) {
            let confidence = raw.confidence.unwrap();
            assert!((0.4..1.0).contains(&confidence));
            let xyxy = raw.xyxy.as_ref().unwrap();
            assert!(xyxy[0] >= 0.0 && xyxy[2] <= config.width as f32);
            assert!(xyxy[1] >= 0.0 && xyxy[3] <= config.height as f32);
        }
    }

    #[test]
    fn same_seed_replays_same_frames() {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            frames: 5,
            seed: 42,
            ..Default::default()
        };
        let detector = SyntheticDetector::new(config, dir.path());
        let options = DetectOptions::default();
        assert_eq!(
            detector.generate_batch(&options),
            detector.generate_batch(&options)
        );
    }

    #[test]
    fn generator_without_class_names_yields_empty_frames() {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            frames: 4,
            empty_frame_ratio: 0.0,
            class_names: Vec::new(),
            ..Default::default()
        };
        let batch =
            SyntheticDetector::new(config, dir.path()).generate_batch(&DetectOptions::default());
        assert!(batch.names.is_empty());
        assert_eq!(batch.frames.len(), 4);
        assert_eq!(batch.box_count(), 0);
    }
}
