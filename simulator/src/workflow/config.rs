use anyhow::Context;
use damagecore::detector::DetectOptions;
use damagecore::report::DEFAULT_TITLE;
use damagecore::SeverityConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::synthetic::GeneratorConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    #[default]
    Synthetic,
    Replay,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub kind: DetectorKind,
    /// Exported detector output; defaults to `<media>.detections.json`.
    pub replay_path: Option<PathBuf>,
    #[serde(flatten)]
    pub options: DetectOptions,
    pub generator: GeneratorConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub title: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub detector: DetectorSettings,
    pub severity: SeverityConfig,
    pub report: ReportSettings,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Layers command-line values over a loaded or default config.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(policy) = overrides.policy {
            self.severity.policy = policy;
        }
        if let Some(dir) = overrides.output_dir {
            self.report.output_dir = dir;
        }
        if let Some(frames) = overrides.frames {
            self.detector.generator.frames = frames;
        }
        if let Some(seed) = overrides.seed {
            self.detector.generator.seed = seed;
        }
        if let Some(path) = overrides.replay {
            self.detector.kind = DetectorKind::Replay;
            self.detector.replay_path = Some(path);
        }
        self
    }
}

/// Values given on the command line; `None` keeps the config's value.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub policy: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub frames: Option<usize>,
    pub seed: Option<u64>,
    pub replay: Option<PathBuf>,
}
