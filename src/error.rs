// Error types for the Lanzou client.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the library can report.
///
/// Listing and delete operations never surface these to their callers (they
/// log and fall back to an empty result), so in practice callers see
/// precondition errors, upload failures and the fatal [`LanzouError::LoginFailed`].
#[derive(Error, Debug)]
pub enum LanzouError {
    /// The service answered with a non-200 status code.
    #[error("HTTP error: {0}")]
    Http(u16),

    /// Network request error.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service reported a failure (`zt != 1`), carrying its `info` text.
    #[error("service error: {0}")]
    Service(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("already at the root folder")]
    AlreadyAtRoot,

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("local file does not exist: {}", .0.display())]
    LocalFileMissing(PathBuf),

    /// The local file is larger than the service accepts for free accounts.
    #[error("file size {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// A command was invoked without its required argument.
    #[error("missing argument, usage: {0}")]
    MissingArgument(&'static str),

    #[error("upload failed after {attempts} attempt(s): {reason}")]
    UploadFailed { attempts: u32, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// Login could not be completed. The binary terminates on this variant.
    #[error("login failed: {0}")]
    LoginFailed(String),
}

impl LanzouError {
    /// Whether the process should stop instead of continuing unauthenticated.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LanzouError::LoginFailed(_))
    }
}

/// Result type alias for Lanzou operations.
pub type Result<T> = std::result::Result<T, LanzouError>;
