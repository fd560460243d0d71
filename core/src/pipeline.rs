use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::detector::{DetectOptions, DetectionBatch, Detector};
use crate::prelude::{ProcessingStage, StageResult};
use crate::processing::{
    Aggregator, PolicyKind, SeverityClassifier, SeverityConfig, SeveritySummary, SummaryBuilder,
};
use crate::table::DetectionTable;
use crate::telemetry::metrics::{MetricsRecorder, RunStats};

const PREVIEW_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Table, summary and counters produced from one detection batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchAnalysis {
    pub table: DetectionTable,
    pub summary: SeveritySummary,
    pub stats: RunStats,
}

/// Result of one pipeline run over a media file.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub annotated_media: PathBuf,
    /// Image to embed in the report; `None` when the detector produced only
    /// a video and no still.
    pub preview_image: Option<PathBuf>,
    pub table: DetectionTable,
    pub summary: SeveritySummary,
    pub stats: RunStats,
    pub processing_time: Duration,
}

impl Analysis {
    pub fn no_damage_detected(&self) -> bool {
        self.table.is_empty()
    }
}

/// Entry point: detector output in, classified table and summary out.
///
/// Holds configuration only. Every call builds its own stages and counters,
/// so one `Pipeline` can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    severity: SeverityConfig,
    kind: PolicyKind,
}

impl Pipeline {
    /// Fails before any work when the policy name or thresholds are invalid.
    pub fn new(severity: SeverityConfig) -> StageResult<Self> {
        let kind = SeverityClassifier::from_config(&severity)?.kind();
        Ok(Self { severity, kind })
    }

    pub fn policy(&self) -> PolicyKind {
        self.kind
    }

    pub fn analyze(
        &self,
        detector: &dyn Detector,
        media: &Path,
        options: &DetectOptions,
    ) -> StageResult<Analysis> {
        let started = Instant::now();
        let output = detector.detect(media, options)?;
        debug!(
            "{} detector returned {} frames for {}",
            detector.name(),
            output.batch.frames.len(),
            media.display()
        );

        let BatchAnalysis {
            table,
            summary,
            stats,
        } = self.analyze_batch(&output.batch)?;
        let processing_time = started.elapsed();

        let preview_image = output.preview_image.or_else(|| {
            is_still_image(&output.annotated_media).then(|| output.annotated_media.clone())
        });

        info!(
            "analyzed {} in {:.3}s: {} detections over {} frames",
            media.display(),
            processing_time.as_secs_f64(),
            table.len(),
            stats.frames
        );
        Ok(Analysis {
            annotated_media: output.annotated_media,
            preview_image,
            table,
            summary,
            stats,
            processing_time,
        })
    }

    /// Runs aggregation, classification and summary over a batch.
    pub fn analyze_batch(&self, batch: &DetectionBatch) -> StageResult<BatchAnalysis> {
        let metrics = MetricsRecorder::new();
        let classifier = SeverityClassifier::from_config(&self.severity)?;

        let table = Aggregator::new(&metrics).execute(batch)?;
        let table = classifier.execute(&table)?;
        let summary = SummaryBuilder::new().execute(&table)?;

        Ok(BatchAnalysis {
            table,
            summary,
            stats: metrics.snapshot(),
        })
    }
}

fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PREVIEW_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{ClassNames, FrameResult, RawBox, StubDetector};
    use crate::prelude::StageError;
    use crate::processing::SeverityTier;

    fn names() -> ClassNames {
        [(0, "crack"), (1, "pothole")].into_iter().collect()
    }

    fn run(frames: Vec<FrameResult>) -> Analysis {
        let detector = StubDetector::new(DetectionBatch::new(names(), frames));
        Pipeline::new(SeverityConfig::default())
            .unwrap()
            .analyze(&detector, Path::new("road.jpg"), &DetectOptions::default())
            .unwrap()
    }

    #[test]
    fn single_empty_frame_means_no_damage() {
        let analysis = run(vec![FrameResult::empty()]);
        assert!(analysis.no_damage_detected());
        assert!(analysis.summary.is_empty());
        assert_eq!(analysis.stats.frames, 1);
    }

    #[test]
    fn single_large_confident_box_is_severe() {
        // 300 x 200 = 60000 px
        let analysis = run(vec![FrameResult::new(vec![RawBox::new(
            1,
            0.9,
            [0.0, 0.0, 300.0, 200.0],
        )])]);
        assert_eq!(analysis.table.len(), 1);
        let record = &analysis.table.records()[0];
        assert_eq!(record.bbox_area(), 60_000);
        assert_eq!(record.severity(), Some(SeverityTier::Severe));

        let pothole = analysis.summary.class("pothole").unwrap();
        assert_eq!(pothole.count, 1);
        assert!((pothole.mean_confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn rounded_confidence_survives_into_the_summary() {
        let analysis = run(vec![FrameResult::new(vec![
            RawBox::new(1, 0.9, [0.0, 0.0, 10.0, 10.0]),
            RawBox::new(1, 0.123_4, [0.0, 0.0, 10.0, 10.0]),
        ])]);
        assert_eq!(analysis.table.records()[0].confidence(), 0.9);
        assert_eq!(analysis.table.records()[1].confidence(), 0.123);
        let mean = analysis.summary.class("pothole").unwrap().mean_confidence;
        assert!((mean - 0.5115).abs() < 1e-12);
    }

    #[test]
    fn still_media_becomes_the_preview() {
        let analysis = run(vec![FrameResult::empty()]);
        assert_eq!(analysis.preview_image, Some(PathBuf::from("road.jpg")));

        let detector = StubDetector::new(DetectionBatch::new(names(), vec![FrameResult::empty()]));
        let video = Pipeline::new(SeverityConfig::default())
            .unwrap()
            .analyze(&detector, Path::new("drive.mp4"), &DetectOptions::default())
            .unwrap();
        assert!(video.preview_image.is_none());
    }

    #[test]
    fn rerunning_the_same_batch_is_deterministic() {
        let batch = DetectionBatch::new(
            names(),
            vec![
                FrameResult::new(vec![RawBox::new(0, 0.71, [0.0, 0.0, 90.0, 90.0])]),
                FrameResult::new(vec![RawBox::new(1, 0.33, [5.0, 5.0, 500.0, 400.0])]),
            ],
        );
        let pipeline = Pipeline::new(SeverityConfig::with_policy("confidence_only")).unwrap();
        let first = pipeline.analyze_batch(&batch).unwrap();
        let second = pipeline.analyze_batch(&batch).unwrap();
        assert_eq!(first.table, second.table);
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn unsupported_policy_fails_before_detection() {
        assert!(matches!(
            Pipeline::new(SeverityConfig::with_policy("ensemble")),
            Err(StageError::UnsupportedSeverityPolicy(_))
        ));
    }
}
