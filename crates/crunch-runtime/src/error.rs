use crunch_core::CoreReason;
use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum RuntimeReason {
    #[error("record source error")]
    Source,
    #[error("event sink error")]
    Sink,
    #[error("shutdown error")]
    Shutdown,
    #[error("{0}")]
    Core(CoreReason),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RuntimeReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Source => 2001,
            Self::Sink => 2002,
            Self::Shutdown => 2003,
            Self::Core(c) => c.error_code(),
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RuntimeError = StructError<RuntimeReason>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Helpers for [`EventSink`](crate::sink::EventSink) and
/// [`RecordSource`](crate::source::RecordSource) implementations.
pub fn sink_error(detail: impl Into<String>) -> RuntimeError {
    StructError::from(RuntimeReason::Sink).with_detail(detail.into())
}

pub fn source_error(detail: impl Into<String>) -> RuntimeError {
    StructError::from(RuntimeReason::Source).with_detail(detail.into())
}
