pub mod record;

pub use record::{BoundingBox, DetectionRecord, DetectionTable};
