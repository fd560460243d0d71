use std::path::Path;

use crate::detector::frame::{DetectOptions, DetectorOutput};
use crate::prelude::StageResult;

/// External object-detection capability.
///
/// The caller constructs a detector once and lends it to each pipeline run.
/// Implementations must not keep per-run state between calls.
pub trait Detector {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection over an image or video and return one frame result per
    /// processed frame, in order.
    fn detect(&self, media: &Path, options: &DetectOptions) -> StageResult<DetectorOutput>;
}
