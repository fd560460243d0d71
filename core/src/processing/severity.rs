use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::prelude::{ProcessingStage, StageError, StageResult};
use crate::table::DetectionTable;
use crate::telemetry::log::LogManager;

/// Which threshold policy assigns severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Box area OR confidence, Severe/Moderate/Minor.
    DualThreshold,
    /// Confidence alone, High/Medium/Low.
    ConfidenceOnly,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::DualThreshold => "dual_threshold",
            PolicyKind::ConfidenceOnly => "confidence_only",
        }
    }

    /// Tier vocabulary of the policy, lowest severity first.
    pub fn tiers(&self) -> [SeverityTier; 3] {
        match self {
            PolicyKind::DualThreshold => [
                SeverityTier::Minor,
                SeverityTier::Moderate,
                SeverityTier::Severe,
            ],
            PolicyKind::ConfidenceOnly => {
                [SeverityTier::Low, SeverityTier::Medium, SeverityTier::High]
            }
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = StageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "dual_threshold" | "dual" | "area_confidence" => Ok(PolicyKind::DualThreshold),
            "confidence_only" | "confidence" => Ok(PolicyKind::ConfidenceOnly),
            _ => Err(StageError::UnsupportedSeverityPolicy(value.to_string())),
        }
    }
}

/// Severity bucket. Each policy owns exactly three of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityTier {
    Minor,
    Moderate,
    Severe,
    Low,
    Medium,
    High,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Minor => "Minor",
            SeverityTier::Moderate => "Moderate",
            SeverityTier::Severe => "Severe",
            SeverityTier::Low => "Low",
            SeverityTier::Medium => "Medium",
            SeverityTier::High => "High",
        }
    }

    /// Position inside the owning policy, 0 = least severe.
    pub fn rank(&self) -> usize {
        match self {
            SeverityTier::Minor | SeverityTier::Low => 0,
            SeverityTier::Moderate | SeverityTier::Medium => 1,
            SeverityTier::Severe | SeverityTier::High => 2,
        }
    }

    pub fn policy(&self) -> PolicyKind {
        match self {
            SeverityTier::Minor | SeverityTier::Moderate | SeverityTier::Severe => {
                PolicyKind::DualThreshold
            }
            SeverityTier::Low | SeverityTier::Medium | SeverityTier::High => {
                PolicyKind::ConfidenceOnly
            }
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityTier {
    type Err = StageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Minor" => Ok(SeverityTier::Minor),
            "Moderate" => Ok(SeverityTier::Moderate),
            "Severe" => Ok(SeverityTier::Severe),
            "Low" => Ok(SeverityTier::Low),
            "Medium" => Ok(SeverityTier::Medium),
            "High" => Ok(SeverityTier::High),
            other => Err(StageError::Export(format!("unknown severity tier {other}"))),
        }
    }
}

/// A threshold policy. All comparisons are strict greater-than.
pub trait SeverityPolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;
    fn classify(&self, confidence: f64, bbox_area: u64) -> SeverityTier;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaThresholds {
    pub severe: u64,
    pub moderate: u64,
}

impl Default for AreaThresholds {
    fn default() -> Self {
        Self {
            severe: 50_000,
            moderate: 20_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub severe: f64,
    pub moderate: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            severe: 0.85,
            moderate: 0.65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceOnlyThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceOnlyThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
        }
    }
}

/// `Severe` if area or confidence clears the upper pair, `Moderate` if
/// either clears the lower pair, else `Minor`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DualThresholdPolicy {
    pub area: AreaThresholds,
    pub confidence: ConfidenceThresholds,
}

impl SeverityPolicy for DualThresholdPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::DualThreshold
    }

    fn classify(&self, confidence: f64, bbox_area: u64) -> SeverityTier {
        if bbox_area > self.area.severe || confidence > self.confidence.severe {
            SeverityTier::Severe
        } else if bbox_area > self.area.moderate || confidence > self.confidence.moderate {
            SeverityTier::Moderate
        } else {
            SeverityTier::Minor
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceOnlyPolicy {
    pub thresholds: ConfidenceOnlyThresholds,
}

impl SeverityPolicy for ConfidenceOnlyPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ConfidenceOnly
    }

    fn classify(&self, confidence: f64, _bbox_area: u64) -> SeverityTier {
        if confidence > self.thresholds.high {
            SeverityTier::High
        } else if confidence > self.thresholds.medium {
            SeverityTier::Medium
        } else {
            SeverityTier::Low
        }
    }
}

/// Policy selection plus the thresholds of both policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    pub policy: String,
    pub area_thresholds: AreaThresholds,
    pub confidence_thresholds: ConfidenceThresholds,
    pub confidence_only_thresholds: ConfidenceOnlyThresholds,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::DualThreshold.as_str().to_string(),
            area_thresholds: AreaThresholds::default(),
            confidence_thresholds: ConfidenceThresholds::default(),
            confidence_only_thresholds: ConfidenceOnlyThresholds::default(),
        }
    }
}

impl SeverityConfig {
    pub fn with_policy(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> StageResult<PolicyKind> {
        self.policy.parse()
    }

    /// Resolves the configured policy, rejecting unknown names and
    /// thresholds whose upper bound sits below the lower one.
    pub fn build_policy(&self) -> StageResult<Box<dyn SeverityPolicy>> {
        match self.kind()? {
            PolicyKind::DualThreshold => {
                let area = self.area_thresholds;
                let confidence = self.confidence_thresholds;
                if area.severe < area.moderate || confidence.severe < confidence.moderate {
                    return Err(StageError::InvalidConfig(format!(
                        "dual thresholds out of order: area {}/{}, confidence {}/{}",
                        area.severe, area.moderate, confidence.severe, confidence.moderate
                    )));
                }
                Ok(Box::new(DualThresholdPolicy { area, confidence }))
            }
            PolicyKind::ConfidenceOnly => {
                let thresholds = self.confidence_only_thresholds;
                if thresholds.high < thresholds.medium {
                    return Err(StageError::InvalidConfig(format!(
                        "confidence thresholds out of order: {}/{}",
                        thresholds.high, thresholds.medium
                    )));
                }
                Ok(Box::new(ConfidenceOnlyPolicy { thresholds }))
            }
        }
    }
}

/// Fills in the severity of every record with one policy.
pub struct SeverityClassifier {
    policy: Box<dyn SeverityPolicy>,
    logger: LogManager,
}

impl SeverityClassifier {
    pub fn new(policy: Box<dyn SeverityPolicy>) -> Self {
        Self {
            policy,
            logger: LogManager::new("severity"),
        }
    }

    pub fn from_config(config: &SeverityConfig) -> StageResult<Self> {
        Ok(Self::new(config.build_policy()?))
    }

    pub fn kind(&self) -> PolicyKind {
        self.policy.kind()
    }
}

impl ProcessingStage for SeverityClassifier {
    type Input = DetectionTable;
    type Output = DetectionTable;

    fn name(&self) -> &'static str {
        "severity"
    }

    fn execute(&self, table: &DetectionTable) -> StageResult<DetectionTable> {
        let kind = self.kind();
        if let Some(existing) = table.policy().filter(|existing| *existing != kind) {
            return Err(StageError::PolicyMismatch {
                existing: existing.as_str(),
                requested: kind.as_str(),
            });
        }

        let records = table
            .iter()
            .map(|record| {
                let tier = self
                    .policy
                    .classify(record.confidence(), record.bbox_area());
                record.clone().with_severity(tier)
            })
            .collect::<Vec<_>>();

        self.logger
            .record(&format!("classified {} records with {}", records.len(), kind));
        Ok(DetectionTable::classified(records, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{BoundingBox, DetectionRecord};

    fn record(confidence: f64, width: i64, height: i64) -> DetectionRecord {
        DetectionRecord::new(0, "pothole", confidence, BoundingBox::new(0, 0, width, height))
            .unwrap()
    }

    fn dual() -> DualThresholdPolicy {
        DualThresholdPolicy::default()
    }

    #[test]
    fn dual_policy_orders_tiers() {
        assert_eq!(dual().classify(0.9, 60_000), SeverityTier::Severe);
        assert_eq!(dual().classify(0.3, 60_000), SeverityTier::Severe);
        assert_eq!(dual().classify(0.7, 100), SeverityTier::Moderate);
        assert_eq!(dual().classify(0.3, 25_000), SeverityTier::Moderate);
        assert_eq!(dual().classify(0.3, 100), SeverityTier::Minor);
    }

    #[test]
    fn dual_policy_boundaries_fall_to_lower_tier() {
        assert_eq!(dual().classify(0.85, 0), SeverityTier::Moderate);
        assert_eq!(dual().classify(0.85001, 0), SeverityTier::Severe);
        assert_eq!(dual().classify(0.65, 0), SeverityTier::Minor);
        assert_eq!(dual().classify(0.1, 50_000), SeverityTier::Moderate);
        assert_eq!(dual().classify(0.1, 20_000), SeverityTier::Minor);
    }

    #[test]
    fn confidence_only_policy_ignores_area() {
        let policy = ConfidenceOnlyPolicy::default();
        assert_eq!(policy.classify(0.81, 0), SeverityTier::High);
        assert_eq!(policy.classify(0.8, 1_000_000), SeverityTier::Medium);
        assert_eq!(policy.classify(0.5, 1_000_000), SeverityTier::Low);
    }

    #[test]
    fn unknown_policy_name_fails_fast() {
        let config = SeverityConfig::with_policy("fuzzy");
        assert!(matches!(
            config.build_policy(),
            Err(StageError::UnsupportedSeverityPolicy(name)) if name == "fuzzy"
        ));
    }

    #[test]
    fn policy_aliases_resolve() {
        assert_eq!("dual".parse::<PolicyKind>().unwrap(), PolicyKind::DualThreshold);
        assert_eq!(
            "Confidence-Only".parse::<PolicyKind>().unwrap(),
            PolicyKind::ConfidenceOnly
        );
    }

    #[test]
    fn misordered_thresholds_are_rejected() {
        let mut config = SeverityConfig::default();
        config.area_thresholds.severe = 10;
        assert!(matches!(
            config.build_policy(),
            Err(StageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn classifier_labels_every_record_from_its_own_vocabulary() {
        let table = DetectionTable::from_records(vec![
            record(0.9, 300, 200),
            record(0.4, 10, 10),
            record(0.7, 10, 10),
        ]);
        for kind in [PolicyKind::DualThreshold, PolicyKind::ConfidenceOnly] {
            let classifier =
                SeverityClassifier::from_config(&SeverityConfig::with_policy(kind.as_str()))
                    .unwrap();
            assert_eq!(classifier.kind(), kind);
            let classified = classifier.execute(&table).unwrap();
            assert_eq!(classified.len(), table.len());
            assert_eq!(classified.policy(), Some(kind));
            for (before, after) in table.iter().zip(classified.iter()) {
                assert_eq!(before.confidence(), after.confidence());
                let tier = after.severity().unwrap();
                assert!(kind.tiers().contains(&tier));
            }
        }
    }

    #[test]
    fn reclassifying_with_same_policy_is_idempotent() {
        let table = DetectionTable::from_records(vec![record(0.66, 150, 150), record(0.2, 1, 1)]);
        let classifier = SeverityClassifier::from_config(&SeverityConfig::default()).unwrap();
        let once = classifier.execute(&table).unwrap();
        let twice = classifier.execute(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn reclassifying_with_other_policy_is_refused() {
        let table = DetectionTable::from_records(vec![record(0.66, 150, 150)]);
        let dual = SeverityClassifier::from_config(&SeverityConfig::default()).unwrap();
        let confidence =
            SeverityClassifier::from_config(&SeverityConfig::with_policy("confidence_only"))
                .unwrap();
        let classified = dual.execute(&table).unwrap();
        assert!(matches!(
            confidence.execute(&classified),
            Err(StageError::PolicyMismatch { .. })
        ));
    }
}
