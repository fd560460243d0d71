pub mod backend;
pub mod frame;
pub mod replay;
pub mod stub;

pub use backend::Detector;
pub use frame::{ClassNames, DetectOptions, DetectionBatch, DetectorOutput, FrameResult, RawBox};
pub use replay::ReplayDetector;
pub use stub::StubDetector;
