/// Core error types for the fxchain composer.
use std::path::PathBuf;

/// A specialized Result type for fxchain operations.
pub type FxResult<T> = Result<T, FxError>;

/// Top-level error type encompassing all fxchain subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("invalid stage: a stage with id '{id}' already exists")]
    InvalidStage { id: String },

    #[error("stage not found: '{id}'")]
    NotFound { id: String },

    #[error("invalid position {position} (pipeline has {len} stages)")]
    InvalidPosition { position: usize, len: usize },

    #[error("stage '{id}' failed to initialize: {reason}")]
    StageInitialization { id: String, reason: String },

    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    #[error("frame dropped by stage '{stage}': {reason}")]
    FrameDropped { stage: String, reason: String },

    #[error("parse error: {message} at {line}:{column}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("asset error: {message} ({path:?})")]
    Asset { message: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FxError {
    /// Create a parse error with source location.
    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        FxError::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    /// Create an asset error.
    pub fn asset(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        FxError::Asset {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Create a parameter validation error.
    pub fn invalid_param(param: impl Into<String>, reason: impl Into<String>) -> Self {
        FxError::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Create a stage initialization error.
    pub fn stage_init(id: impl Into<String>, reason: impl ToString) -> Self {
        FxError::StageInitialization {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}
