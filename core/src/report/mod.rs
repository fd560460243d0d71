pub mod chart;
pub mod document;
pub mod export;
pub mod publish;

pub use chart::render_severity_chart;
pub use document::DocumentBuilder;
pub use export::{read_table_export, write_table_export, ExportRow};

use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::Analysis;
use crate::prelude::{StageError, StageResult};
use crate::processing::SeveritySummary;
use crate::table::DetectionTable;

pub const TABLE_FILE: &str = "detections.csv";
pub const CHART_FILE: &str = "severity_chart.png";
pub const DOCUMENT_FILE: &str = "damage_report.pdf";
pub const DEFAULT_TITLE: &str = "Road Damage Detection Report";

/// Inputs of one report document, borrowed from the run that produced them.
#[derive(Debug, Clone, Copy)]
pub struct ReportBundle<'a> {
    pub preview: &'a Path,
    pub table: &'a DetectionTable,
    pub summary: &'a SeveritySummary,
    pub chart: &'a Path,
    pub processing_time: Duration,
    pub frames: usize,
}

/// Per-artifact results of a synthesis pass.
///
/// Each artifact succeeds or fails on its own; a failed document does not
/// invalidate the export or the chart.
#[derive(Debug)]
pub struct ReportOutcome {
    pub table_export: StageResult<PathBuf>,
    pub chart: StageResult<PathBuf>,
    pub document: StageResult<PathBuf>,
}

impl ReportOutcome {
    pub fn is_complete(&self) -> bool {
        self.first_error().is_none()
    }

    pub fn first_error(&self) -> Option<&StageError> {
        [&self.table_export, &self.chart, &self.document]
            .into_iter()
            .find_map(|result| result.as_ref().err())
    }
}

/// Writes the export, chart and document of a run into one directory.
pub struct ReportSynthesizer {
    output_dir: PathBuf,
    document: DocumentBuilder,
}

impl ReportSynthesizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_title(output_dir, DEFAULT_TITLE)
    }

    pub fn with_title(output_dir: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            document: DocumentBuilder::new(title),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn synthesize(&self, analysis: &Analysis) -> ReportOutcome {
        let table_path = self.output_dir.join(TABLE_FILE);
        let table_export =
            write_table_export(&analysis.table, &table_path).map(|()| table_path);

        let chart_path = self.output_dir.join(CHART_FILE);
        let chart = render_severity_chart(&analysis.summary.severity_counts, &chart_path)
            .map(|()| chart_path.clone());

        // A chart left over from an earlier run must not stand in for this one.
        let document = match &chart {
            Ok(chart) => self.build_document(&ReportBundle {
                preview: analysis
                    .preview_image
                    .as_deref()
                    .unwrap_or(&analysis.annotated_media),
                table: &analysis.table,
                summary: &analysis.summary,
                chart,
                processing_time: analysis.processing_time,
                frames: analysis.stats.frames,
            }),
            Err(_) => Err(StageError::MissingArtifact(chart_path)),
        };

        for (artifact, result) in [
            ("table export", &table_export),
            ("chart", &chart),
            ("document", &document),
        ] {
            match result {
                Ok(path) => info!("{} written to {}", artifact, path.display()),
                Err(err) => warn!("{} not produced: {}", artifact, err),
            }
        }

        ReportOutcome {
            table_export,
            chart,
            document,
        }
    }

    pub fn build_document(&self, bundle: &ReportBundle<'_>) -> StageResult<PathBuf> {
        let path = self.output_dir.join(DOCUMENT_FILE);
        self.document.build(bundle, &path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{
        ClassNames, DetectOptions, DetectionBatch, FrameResult, RawBox, StubDetector,
    };
    use crate::pipeline::Pipeline;
    use crate::processing::SeverityConfig;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn write_preview(dir: &Path) -> PathBuf {
        let path = dir.join("annotated.png");
        RgbImage::from_pixel(64, 48, Rgb([120, 120, 120]))
            .save(&path)
            .unwrap();
        path
    }

    fn analysis(dir: &Path, frames: Vec<FrameResult>) -> Analysis {
        let names: ClassNames = [(0, "crack"), (1, "pothole")].into_iter().collect();
        let detector = StubDetector::new(DetectionBatch::new(names, frames))
            .with_preview_image(write_preview(dir));
        Pipeline::new(SeverityConfig::default())
            .unwrap()
            .analyze(&detector, &dir.join("road.jpg"), &DetectOptions::default())
            .unwrap()
    }

    #[test]
    fn full_synthesis_writes_every_artifact() {
        let dir = TempDir::new().unwrap();
        let analysis = analysis(
            dir.path(),
            vec![FrameResult::new(vec![
                RawBox::new(0, 0.91, [0.0, 0.0, 120.0, 80.0]),
                RawBox::new(1, 0.42, [10.0, 10.0, 20.0, 20.0]),
            ])],
        );
        let outcome = ReportSynthesizer::new(dir.path().join("report")).synthesize(&analysis);

        assert!(outcome.is_complete(), "{outcome:?}");
        let pdf = fs::read(outcome.document.as_ref().unwrap()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        let rows = read_table_export(outcome.table_export.as_ref().unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn empty_run_still_produces_a_document() {
        let dir = TempDir::new().unwrap();
        let analysis = analysis(dir.path(), vec![FrameResult::empty()]);
        assert!(analysis.no_damage_detected());

        let outcome = ReportSynthesizer::new(dir.path().join("report")).synthesize(&analysis);
        assert!(outcome.is_complete(), "{outcome:?}");
    }

    #[test]
    fn missing_chart_fails_document_only() {
        let dir = TempDir::new().unwrap();
        let analysis = analysis(
            dir.path(),
            vec![FrameResult::new(vec![RawBox::new(1, 0.7, [0.0, 0.0, 50.0, 50.0])])],
        );
        let synthesizer = ReportSynthesizer::new(dir.path().join("report"));
        let missing_chart = dir.path().join("nowhere").join("chart.png");
        let preview = analysis.preview_image.clone().unwrap();
        let bundle = ReportBundle {
            preview: &preview,
            table: &analysis.table,
            summary: &analysis.summary,
            chart: &missing_chart,
            processing_time: analysis.processing_time,
            frames: analysis.stats.frames,
        };

        let err = synthesizer.build_document(&bundle).unwrap_err();
        assert!(matches!(err, StageError::MissingArtifact(path) if path == missing_chart));
        assert!(!synthesizer.output_dir().join(DOCUMENT_FILE).exists());
        assert_eq!(analysis.table.len(), 1);
        assert_eq!(analysis.summary.total_detections, 1);
    }

    #[test]
    fn video_without_preview_keeps_export_and_chart() {
        let dir = TempDir::new().unwrap();
        let names: ClassNames = [(0, "crack")].into_iter().collect();
        let detector = StubDetector::new(DetectionBatch::new(
            names,
            vec![FrameResult::new(vec![RawBox::new(0, 0.5, [0.0, 0.0, 5.0, 5.0])])],
        ));
        let analysis = Pipeline::new(SeverityConfig::default())
            .unwrap()
            .analyze(&detector, &dir.path().join("drive.mp4"), &DetectOptions::default())
            .unwrap();

        let outcome = ReportSynthesizer::new(dir.path().join("report")).synthesize(&analysis);
        assert!(outcome.table_export.is_ok());
        assert!(outcome.chart.is_ok());
        assert!(matches!(outcome.document, Err(StageError::MissingArtifact(_))));
        assert!(matches!(
            outcome.first_error(),
            Some(StageError::MissingArtifact(_))
        ));
    }
}
