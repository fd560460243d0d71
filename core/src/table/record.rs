use serde::Serialize;
use std::fmt;

use crate::processing::severity::{PolicyKind, SeverityTier};

/// Box corners in integer source-media pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// `None` when the span does not fit in an `i64`.
    pub fn width(&self) -> Option<i64> {
        self.x2.checked_sub(self.x1)
    }

    pub fn height(&self) -> Option<i64> {
        self.y2.checked_sub(self.y1)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One detected damage instance.
///
/// Geometry is derived from the box on construction and cannot drift from
/// it afterwards. Severity starts empty and is filled in by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    frame_index: usize,
    class_label: String,
    confidence: f64,
    bbox: BoundingBox,
    width: u32,
    height: u32,
    bbox_area: u64,
    severity: Option<SeverityTier>,
}

impl DetectionRecord {
    /// Returns `None` when the box corners are reversed or too far apart
    /// to be pixel coordinates.
    pub fn new(
        frame_index: usize,
        class_label: impl Into<String>,
        confidence: f64,
        bbox: BoundingBox,
    ) -> Option<Self> {
        let width = u32::try_from(bbox.width()?).ok()?;
        let height = u32::try_from(bbox.height()?).ok()?;
        Some(Self {
            frame_index,
            class_label: class_label.into(),
            confidence,
            bbox,
            width,
            height,
            bbox_area: u64::from(width) * u64::from(height),
            severity: None,
        })
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn class_label(&self) -> &str {
        &self.class_label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bbox_area(&self) -> u64 {
        self.bbox_area
    }

    pub fn severity(&self) -> Option<SeverityTier> {
        self.severity
    }

    pub(crate) fn with_severity(mut self, tier: SeverityTier) -> Self {
        self.severity = Some(tier);
        self
    }
}

/// Ordered detections of one pipeline run.
///
/// Rows keep aggregation order: frame index, then detection order within the
/// frame. `policy` names the classifier that filled in severities, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionTable {
    records: Vec<DetectionRecord>,
    policy: Option<PolicyKind>,
}

impl DetectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<DetectionRecord>) -> Self {
        Self {
            records,
            policy: None,
        }
    }

    pub(crate) fn classified(records: Vec<DetectionRecord>, policy: PolicyKind) -> Self {
        Self {
            records,
            policy: Some(policy),
        }
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// An empty table is the "no damage detected" outcome, not a failure.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn policy(&self) -> Option<PolicyKind> {
        self.policy
    }
}

impl<'a> IntoIterator for &'a DetectionTable {
    type Item = &'a DetectionRecord;
    type IntoIter = std::slice::Iter<'a, DetectionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_derives_geometry_from_box() {
        let record =
            DetectionRecord::new(3, "crack", 0.7, BoundingBox::new(10, 20, 310, 220)).unwrap();
        assert_eq!(record.width(), 300);
        assert_eq!(record.height(), 200);
        assert_eq!(record.bbox_area(), 60_000);
        assert!(record.severity().is_none());
    }

    #[test]
    fn degenerate_box_has_zero_area() {
        let record = DetectionRecord::new(0, "crack", 0.4, BoundingBox::new(5, 5, 5, 40)).unwrap();
        assert_eq!(record.bbox_area(), 0);
    }

    #[test]
    fn corners_beyond_i64_span_are_rejected() {
        let bbox = BoundingBox::new(i64::MIN, 0, i64::MAX, 10);
        assert_eq!(bbox.width(), None);
        assert!(DetectionRecord::new(0, "crack", 0.4, bbox).is_none());
    }

    #[test]
    fn reversed_box_is_rejected() {
        assert!(DetectionRecord::new(0, "crack", 0.4, BoundingBox::new(50, 5, 10, 40)).is_none());
    }
}
