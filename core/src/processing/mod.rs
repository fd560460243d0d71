pub mod aggregate;
pub mod extract;
pub mod severity;
pub mod summary;

pub use aggregate::Aggregator;
pub use extract::extract_records;
pub use severity::{PolicyKind, SeverityClassifier, SeverityConfig, SeverityPolicy, SeverityTier};
pub use summary::{ClassSummary, SeveritySummary, SummaryBuilder, TierCount};
