use damagecore::{BatchAnalysis, DetectionBatch, PolicyKind};
use serde::{Deserialize, Serialize};

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    /// Overrides the bridge's configured policy for this request only.
    #[serde(default)]
    pub policy: Option<String>,
    pub batch: DetectionBatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub policy: PolicyKind,
    pub no_damage_detected: bool,
    #[serde(flatten)]
    pub analysis: BatchAnalysis,
}

impl AnalyzeResponse {
    pub fn new(policy: PolicyKind, analysis: BatchAnalysis) -> Self {
        Self {
            policy,
            no_damage_detected: analysis.table.is_empty(),
            analysis,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
