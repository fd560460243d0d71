//! Detection-to-report core for the RoadSense damage pipeline.
//!
//! Raw per-frame detector output flows one way through extraction,
//! aggregation, severity classification and summary, and ends in a report
//! bundle: table export, severity chart and PDF document. The detector is an
//! injected dependency; the core never loads a model itself.

pub mod detector;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod report;
pub mod table;
pub mod telemetry;

pub use detector::{DetectOptions, DetectionBatch, Detector, DetectorOutput};
pub use pipeline::{Analysis, BatchAnalysis, Pipeline};
pub use prelude::{ProcessingStage, StageError, StageResult};
pub use processing::{PolicyKind, SeverityConfig, SeveritySummary, SeverityTier};
pub use report::{ReportOutcome, ReportSynthesizer};
pub use table::{DetectionRecord, DetectionTable};
