//! # Makerdir - spec-driven product photo pipeline
//!
//! Makerdir turns a photo shoot into catalog-ready images in three stages:
//! split the shot pool by a spec document, recompress the results while
//! keeping their color profile, then publish them to the image FTP server and
//! register them with the catalog API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ spec sheet  │────▶│    Split    │────▶│  Compress   │────▶│   Upload    │
//! │ + org/ pool │     │ (tree+json) │     │ (ICC kept)  │     │ (FTP + API) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                       manifest.json ─────────────────────────▶ payload
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use makerdir::{run_split, compress, publish, CompressOptions, Config, LOG_BROADCASTER};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.json".as_ref())?;
//!     let sink = &*LOG_BROADCASTER;
//!
//!     let outcome = run_split(&config, sink)?;
//!     compress(&outcome.small_dirs, &CompressOptions::from_config(&config), sink);
//!     publish(&config, sink).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - `config.json` loading and environment overrides
//! - [`models`] - Spec rows, manifest and catalog wire types
//! - [`scan`] - Shot-order directory listing and SMALL folder discovery
//! - [`parser`] - Spec document reading (workbooks and CSV)
//! - [`icc`] - ICC profile APP2 segment codec
//! - [`planner`] - Split stage
//! - [`transform`] - Compress stage
//! - [`publish`] - Upload stage (FTP store, catalog client, reconciliation)
//! - [`api`] - HTTP API server and progress log

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Input
pub mod parser;
pub mod scan;

// Image codec
pub mod icc;

// Stages
pub mod planner;
pub mod publish;
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CatalogError, CompressError, ConfigError, IccError, ManifestError, PlanError, PublishError,
    RemoteError, ServerError, SheetError,
};

// =============================================================================
// Re-exports - Models & Config
// =============================================================================

pub use config::{default_config_path, Config};
pub use models::{
    CatalogPayload, CatalogResponse, DefaultFlag, Manifest, ManifestEntry, PayloadItem, SpecRow,
};

// =============================================================================
// Re-exports - Stages
// =============================================================================

pub use planner::{run_split, PlanOutcome, Planner, RowWarning};
pub use publish::{
    publish, publish_dry_run, publish_with_store, FtpStore, MemoryStore, PublishReport, RemoteStore,
};
pub use transform::{compress, CompressOptions, CompressReport};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use api::logs::{LogEntry, LogLevel, MemorySink, ProgressSink, LOG_BROADCASTER};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
