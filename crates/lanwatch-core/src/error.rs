use thiserror::Error;

/// Top-level error type for the lanwatch core types.
#[derive(Error, Debug)]
pub enum LanwatchError {
    #[error("Configuration error: {0}")]
    Config(String),
}
