use std::path::PathBuf;

/// Common error type for every pipeline stage.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("malformed frame result at frame {frame_index}: {reason}")]
    MalformedFrameResult { frame_index: usize, reason: String },
    #[error("unsupported severity policy: {0}")]
    UnsupportedSeverityPolicy(String),
    #[error("table already classified with {existing} policy, refusing {requested}")]
    PolicyMismatch {
        existing: &'static str,
        requested: &'static str,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("detector failure: {0}")]
    Detector(String),
    #[error("render failure: {0}")]
    Render(String),
    #[error("export failure: {0}")]
    Export(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl StageError {
    pub(crate) fn malformed(frame_index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedFrameResult {
            frame_index,
            reason: reason.into(),
        }
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// A pure step of the detection pipeline.
///
/// Stages borrow their input and return a fresh output, so running one twice
/// over the same input yields the same result.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn name(&self) -> &'static str;
    fn execute(&self, input: &Self::Input) -> StageResult<Self::Output>;
}
