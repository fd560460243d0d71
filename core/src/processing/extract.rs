use crate::detector::frame::{ClassNames, FrameResult, RawBox};
use crate::math::stats::StatsHelper;
use crate::prelude::{StageError, StageResult};
use crate::table::{BoundingBox, DetectionRecord};

/// Decimal places kept on extracted confidences.
pub const CONFIDENCE_DECIMALS: u32 = 3;

/// Flattens one frame's detector output into detection records.
///
/// A frame without boxes yields an empty list. Any box lacking a class,
/// confidence or four finite coordinates fails the whole frame.
pub fn extract_records(
    frame_index: usize,
    frame: &FrameResult,
    names: &ClassNames,
) -> StageResult<Vec<DetectionRecord>> {
    frame
        .boxes
        .iter()
        .enumerate()
        .map(|(box_index, raw)| extract_box(frame_index, box_index, raw, names))
        .collect()
}

fn extract_box(
    frame_index: usize,
    box_index: usize,
    raw: &RawBox,
    names: &ClassNames,
) -> StageResult<DetectionRecord> {
    let malformed =
        |reason: String| StageError::malformed(frame_index, format!("box {box_index}: {reason}"));

    let class_id = raw
        .class_id
        .ok_or_else(|| malformed("missing class id".into()))?;
    let class_label = names
        .resolve(class_id)
        .ok_or_else(|| malformed(format!("class id {class_id} not in model names")))?;

    let confidence = raw
        .confidence
        .ok_or_else(|| malformed("missing confidence".into()))?;
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(malformed(format!("confidence {confidence} outside [0, 1]")));
    }
    let confidence = StatsHelper::round_to(f64::from(confidence), CONFIDENCE_DECIMALS);

    let coords = raw
        .xyxy
        .as_deref()
        .ok_or_else(|| malformed("missing xyxy coordinates".into()))?;
    let bbox = match coords {
        [x1, y1, x2, y2] if coords.iter().all(|value| value.is_finite()) => BoundingBox::new(
            x1.trunc() as i64,
            y1.trunc() as i64,
            x2.trunc() as i64,
            y2.trunc() as i64,
        ),
        _ => return Err(malformed(format!("expected 4 finite coordinates, got {coords:?}"))),
    };

    DetectionRecord::new(frame_index, class_label, confidence, bbox)
        .ok_or_else(|| malformed(format!("corners reversed or out of range {bbox}")))
}
