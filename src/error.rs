use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please enter a video URL")]
    EmptyUrl,

    #[error("Please select a save location")]
    EmptyDirectory,

    #[error("Could not create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A download is already in progress")]
    Busy,

    #[error("{program} not found. Please install it and make sure it's in your PATH.")]
    ExtractorMissing { program: String },

    #[error("{program} failed (code={code:?}): {stderr}")]
    ExtractorFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("could not read video info: {0}")]
    Metadata(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The specified folder does not exist: {0}")]
    FolderMissing(PathBuf),

    #[error("Could not open {0}")]
    OpenFailed(String),
}

impl AppError {
    /// Input problems caught before any background work starts.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyUrl | Self::EmptyDirectory | Self::CreateDirectory { .. } | Self::Busy
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
