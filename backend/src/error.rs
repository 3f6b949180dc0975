//! Error types for the makerdir pipeline.
//!
//! This module defines a hierarchy of error types, one per concern:
//!
//! - [`ConfigError`] - Configuration loading/saving errors
//! - [`SheetError`] - Spec document (workbook / CSV) errors
//! - [`IccError`] - ICC profile segment encoding/decoding errors
//! - [`PlanError`] - Split stage errors (fatal setup + aggregated row errors)
//! - [`RemoteError`] - Remote file store errors
//! - [`CatalogError`] - Catalog API errors
//! - [`PublishError`] - Upload stage errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading or saving `config.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the file.
    #[error("Config IO error ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required setting is empty.
    #[error("Missing setting: {0}")]
    Missing(&'static str),
}

// =============================================================================
// Spec Document Errors
// =============================================================================

/// Errors while locating or reading the spec document.
#[derive(Debug, Error)]
pub enum SheetError {
    /// No workbook or CSV file in the work directory.
    #[error("No spec document (.xlsx/.xls/.ods/.csv) found in {0}")]
    NotFound(PathBuf),

    /// Failed to read the file or directory.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Workbook could not be opened or has no worksheet.
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// CSV could not be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// ICC Profile Errors
// =============================================================================

/// Errors from the ICC segment codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IccError {
    /// Input does not start with the JPEG SOI marker.
    #[error("Not a valid JPEG: missing SOI marker")]
    NotJpeg,

    /// A segment header or body runs past the end of the stream.
    #[error("Truncated JPEG segment at offset {0}")]
    Truncated(usize),

    /// Profile needs more than 255 APP2 chunks.
    #[error("ICC profile too large: {0} bytes")]
    ProfileTooLarge(usize),
}

// =============================================================================
// Split (Planner) Errors
// =============================================================================

/// Errors from the split stage.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Missing configuration.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Spec document could not be found or read.
    #[error("Spec document error: {0}")]
    Sheet(#[from] SheetError),

    /// Picture directory could not be listed.
    #[error("Failed to read picture directory {path}: {source}")]
    PictureDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest could not be written.
    #[error("Failed to save manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// Some rows failed; everything else completed.
    #[error("Completed with {} row error(s): {}", .0.len(), .0.join("; "))]
    RowsFailed(Vec<String>),
}

/// Errors while loading or saving `manifest.json`.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read or write the file.
    #[error("Manifest IO error ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON.
    #[error("Manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Compress Errors
// =============================================================================

/// Per-file errors from the compress stage. Never fatal to the stage.
#[derive(Debug, Error)]
pub enum CompressError {
    /// Failed to read or replace the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode or encode the image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

// =============================================================================
// Remote Store Errors
// =============================================================================

/// Errors from the remote file store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Could not reach the server.
    #[error("Connection failed ({addr}): {message}")]
    Connect { addr: String, message: String },

    /// Credentials rejected.
    #[error("Login failed: {0}")]
    Login(String),

    /// Directory already exists (tolerated by callers).
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A single command failed.
    #[error("Remote command failed on '{path}': {message}")]
    Command { path: String, message: String },

    /// Local IO while streaming a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Catalog API Errors
// =============================================================================

/// Errors from the catalog API. Never fatal to the upload stage.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Server answered with a message in its error body.
    #[error("API server error: {0}")]
    Server(String),

    /// Server answered with a non-success status and no usable message.
    #[error("API returned status {status}. Body: {body}")]
    Status { status: u16, body: String },

    /// Success status but unparseable body.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Upload (Publisher) Errors
// =============================================================================

/// Fatal errors from the upload stage.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Connection or login failed.
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Nothing to upload.
    #[error("No SMALL directories found in {0}")]
    NoSourceDirs(PathBuf),

    /// Missing configuration.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Split stage error.
    #[error("Split error: {0}")]
    Plan(#[from] PlanError),

    /// Upload stage error.
    #[error("Upload error: {0}")]
    Publish(#[from] PublishError),

    /// Another stage is running.
    #[error("A stage is already running")]
    Busy,

    /// Request body could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for spec document operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for ICC codec operations.
pub type IccResult<T> = Result<T, IccError>;

/// Result type for split operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result type for catalog API operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for upload operations.
pub type PublishResult<T> = Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // SheetError -> PlanError
        let sheet_err = SheetError::NotFound(PathBuf::from("/work"));
        let plan_err: PlanError = sheet_err.into();
        assert!(plan_err.to_string().contains("/work"));

        // RemoteError -> PublishError
        let remote_err = RemoteError::Login("530 Login incorrect".into());
        let publish_err: PublishError = remote_err.into();
        assert!(publish_err.to_string().contains("530"));
    }

    #[test]
    fn test_rows_failed_format() {
        let err = PlanError::RowsFailed(vec![
            "row 2: size table missing".into(),
            "row 5: invalid step count".into(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 row error(s)"));
        assert!(msg.contains("row 5"));
    }
}
