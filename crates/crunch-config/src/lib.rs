pub mod engine;
pub mod logging;
pub mod stream;
pub mod types;
mod validate;

pub use engine::{EngineConfig, EngineSection};
pub use logging::{LogFormat, LoggingConfig};
pub use stream::{StreamConfig, StreamDefaults, StreamOverride};
pub use types::{HumanDuration, LatePolicy};
