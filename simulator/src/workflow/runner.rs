use anyhow::Context;
use damagecore::detector::{Detector, ReplayDetector};
use damagecore::{Analysis, Pipeline, PolicyKind, ReportOutcome, ReportSynthesizer};
use log::info;
use std::path::Path;

use crate::generator::synthetic::SyntheticDetector;
use crate::workflow::config::{DetectorKind, WorkflowConfig};

pub struct WorkflowResult {
    pub analysis: Analysis,
    pub outcome: ReportOutcome,
}

/// Drives one detection-to-report run per call.
pub struct Runner {
    config: WorkflowConfig,
    pipeline: Pipeline,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let pipeline = Pipeline::new(config.severity.clone())
            .context("validating severity configuration")?;
        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn policy(&self) -> PolicyKind {
        self.pipeline.policy()
    }

    /// Builds the detector named by the configuration.
    pub fn build_detector(&self) -> Box<dyn Detector> {
        let settings = &self.config.detector;
        match settings.kind {
            DetectorKind::Synthetic => Box::new(SyntheticDetector::new(
                settings.generator.clone(),
                &self.config.report.output_dir,
            )),
            DetectorKind::Replay => match &settings.replay_path {
                Some(path) => Box::new(ReplayDetector::from_file(path)),
                None => Box::new(ReplayDetector::new()),
            },
        }
    }

    /// Analyses `media` and writes its report bundle.
    ///
    /// Only detection and analysis failures are errors; report artifacts
    /// that fail are reported through the returned outcome.
    pub fn execute(
        &self,
        detector: &dyn Detector,
        media: &Path,
    ) -> anyhow::Result<WorkflowResult> {
        let analysis = self
            .pipeline
            .analyze(detector, media, &self.config.detector.options)
            .with_context(|| {
                format!(
                    "analyzing {} with {} detector",
                    media.display(),
                    detector.name()
                )
            })?;

        let synthesizer = ReportSynthesizer::with_title(
            &self.config.report.output_dir,
            self.config.report.title.as_str(),
        );
        let outcome = synthesizer.synthesize(&analysis);
        info!(
            "run over {} finished: {} detections, report complete: {}",
            media.display(),
            analysis.table.len(),
            outcome.is_complete()
        );

        Ok(WorkflowResult { analysis, outcome })
    }
}
