// src/error.rs
use thiserror::Error;

/// Errors raised at the engine's input boundary.
///
/// The per-frame pipeline itself never fails; these only surface while building
/// hands from tracker payloads or loading configuration and recordings.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("hand has {found} landmarks, expected {expected}")]
    LandmarkCount { expected: usize, found: usize },

    #[error("hand entry is not a landmark list")]
    MalformedHand,

    #[error("landmark {index} has a missing or non-finite coordinate")]
    NonFiniteLandmark { index: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recording line {line}: {source}")]
    Recording {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
