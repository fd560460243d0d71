use serde::Serialize;
use std::collections::BTreeMap;

use crate::math::stats::StatsHelper;
use crate::prelude::{ProcessingStage, StageResult};
use crate::processing::severity::{PolicyKind, SeverityTier};
use crate::table::DetectionTable;
use crate::telemetry::log::LogManager;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub class_label: String,
    pub count: usize,
    /// Unrounded; consumers round for display.
    pub mean_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierCount {
    pub tier: SeverityTier,
    pub count: usize,
}

/// Per-class statistics of one classified table.
///
/// Classes are ordered lexically by label. Tier counts follow the policy's
/// ascending order and include empty tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeveritySummary {
    pub policy: Option<PolicyKind>,
    pub total_detections: usize,
    pub classes: Vec<ClassSummary>,
    pub severity_counts: Vec<TierCount>,
}

impl SeveritySummary {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, label: &str) -> Option<&ClassSummary> {
        self.classes.iter().find(|class| class.class_label == label)
    }
}

pub struct SummaryBuilder {
    logger: LogManager,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("summary"),
        }
    }
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SummaryBuilder {
    type Input = DetectionTable;
    type Output = SeveritySummary;

    fn name(&self) -> &'static str {
        "summary"
    }

    fn execute(&self, table: &DetectionTable) -> StageResult<SeveritySummary> {
        let mut confidences: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for record in table {
            confidences
                .entry(record.class_label())
                .or_default()
                .push(record.confidence());
        }

        let classes = confidences
            .into_iter()
            .map(|(label, values)| ClassSummary {
                class_label: label.to_string(),
                count: values.len(),
                mean_confidence: StatsHelper::mean(&values),
            })
            .collect::<Vec<_>>();

        let severity_counts = table
            .policy()
            .map(|policy| {
                policy
                    .tiers()
                    .into_iter()
                    .map(|tier| TierCount {
                        tier,
                        count: table
                            .iter()
                            .filter(|record| record.severity() == Some(tier))
                            .count(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.logger.record(&format!(
            "{} classes over {} detections",
            classes.len(),
            table.len()
        ));
        Ok(SeveritySummary {
            policy: table.policy(),
            total_detections: table.len(),
            classes,
            severity_counts,
        })
    }
}
