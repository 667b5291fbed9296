use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CoreReason {
    #[error("configuration error")]
    Configuration,
    #[error("incompatible record merge")]
    IncompatibleMerge,
    #[error("evaluation error")]
    Evaluation,
    #[error("data format error")]
    DataFormat,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Configuration => 1001,
            Self::IncompatibleMerge => 1002,
            Self::Evaluation => 1003,
            Self::DataFormat => 1004,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;

/// Shorthand for a builder precondition violation.
pub(crate) fn config_error(detail: impl Into<String>) -> CoreError {
    StructError::from(CoreReason::Configuration).with_detail(detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(CoreReason::Configuration.error_code(), 1001);
        assert_eq!(CoreReason::IncompatibleMerge.error_code(), 1002);
        assert_eq!(CoreReason::Evaluation.error_code(), 1003);
        assert_eq!(CoreReason::DataFormat.error_code(), 1004);
    }

    #[test]
    fn reason_display() {
        assert_eq!(
            CoreReason::IncompatibleMerge.to_string(),
            "incompatible record merge"
        );
    }
}
