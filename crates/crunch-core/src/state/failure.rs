use crate::error::CoreError;

/// Why a multi-step pass was aborted.
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    #[error("step timeout")]
    StepTimeout,
    #[error("overall timeout")]
    OverallTimeout,
    #[error("step evaluation failed")]
    Evaluation(CoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    StepTimeout,
    OverallTimeout,
    Evaluation,
}

impl StepFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            StepFailure::StepTimeout => FailureKind::StepTimeout,
            StepFailure::OverallTimeout => FailureKind::OverallTimeout,
            StepFailure::Evaluation(_) => FailureKind::Evaluation,
        }
    }
}
