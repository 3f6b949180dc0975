//! Upload stage: push SMALL folders to the remote store and sync the catalog.
//!
//! ```text
//! SMALL/* ──store──▶ GoodsColor/<YYYYMMDD>/<file>
//!    │
//!    └─ manifest.json ──ftp_path──▶ payload ──POST──▶ catalog API
//!                                                        │
//!            delete rejected uploads ◀── not_found_sns ──┤
//!            ApiResults/<label>_<ts>.json ◀── id lists ──┘
//! ```

pub mod catalog;
pub mod reconcile;
pub mod remote;

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::api::logs::ProgressSink;
use crate::config::{Config, PUBLIC_PATH_PREFIX, REMOTE_ROOT};
use crate::error::{PublishError, PublishResult, RemoteError};
use crate::models::{CatalogPayload, CatalogResponse, Manifest, PayloadItem};
use crate::scan::find_small_dirs;

pub use catalog::CatalogClient;
pub use reconcile::{reconcile, store_path};
pub use remote::{FtpStore, MemoryStore, RemoteStore};

/// Id list labels, also used as result file name prefixes.
pub const COLOR_PIC_IDS_LABEL: &str = "success_goods_color_pic_ids";
pub const COLOR_IDS_LABEL: &str = "success_goods_color_ids";

/// A file that could not be uploaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailure {
    pub path: PathBuf,
    pub message: String,
}

/// How the catalog call went.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ApiOutcome {
    /// No API URL configured.
    #[default]
    Skipped,
    Accepted { response: CatalogResponse },
    Failed { message: String },
}

/// What the upload stage did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    /// Remote directory everything went to.
    pub remote_dir: String,
    /// Store paths uploaded.
    pub uploaded: Vec<String>,
    pub failures: Vec<UploadFailure>,
    /// Images sent to the catalog.
    pub payload_items: usize,
    pub api: ApiOutcome,
    /// Store paths removed after the catalog rejected their item code.
    pub deleted: Vec<String>,
    pub result_files: Vec<PathBuf>,
    /// Non-fatal problems, in encounter order.
    pub warnings: Vec<String>,
}

impl PublishReport {
    fn warn<L: ProgressSink>(&mut self, sink: &L, message: String) {
        sink.warning(message.clone());
        self.warnings.push(message);
    }
}

/// Upload stage over FTP, using the connection settings in `config`.
pub async fn publish<L: ProgressSink>(config: &Config, sink: &L) -> PublishResult<PublishReport> {
    config.work_root()?;
    sink.info(format!("Connecting to {}...", config.ftp_addr()));
    let mut store = FtpStore::from_config(config)?;
    sink.success("FTP connected");

    publish_with_store(config, &mut store, sink).await
}

/// Upload stage into a [`MemoryStore`]. The manifest is not rewritten and
/// the catalog API is not called.
pub async fn publish_dry_run<L: ProgressSink>(config: &Config, sink: &L) -> PublishResult<PublishReport> {
    sink.info("Dry run: uploading into memory");
    run_stage(config, &mut MemoryStore::new(), sink, false).await
}

/// Upload stage against any remote store.
pub async fn publish_with_store<S, L>(config: &Config, store: &mut S, sink: &L) -> PublishResult<PublishReport>
where
    S: RemoteStore + ?Sized,
    L: ProgressSink,
{
    run_stage(config, store, sink, true).await
}

async fn run_stage<S, L>(config: &Config, store: &mut S, sink: &L, live: bool) -> PublishResult<PublishReport>
where
    S: RemoteStore + ?Sized,
    L: ProgressSink,
{
    let root = config.work_root()?;
    let dirs = find_small_dirs(root);
    if dirs.is_empty() {
        return Err(PublishError::NoSourceDirs(root.to_path_buf()));
    }
    sink.info(format!("Found {} SMALL folder(s)", dirs.len()));

    let mut report = PublishReport {
        remote_dir: format!("{}/{}", REMOTE_ROOT, Local::now().format("%Y%m%d")),
        ..Default::default()
    };

    if let Err(e) = ensure_remote_dir(store, &report.remote_dir) {
        let message = format!("Cannot create remote directory {}: {}", report.remote_dir, e);
        report.warn(sink, message);
    }

    let manifest_path = config.manifest_path();
    let mut manifest = match Manifest::load(&manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            report.warn(sink, format!("Manifest unavailable, uploading without catalog data: {}", e));
            Manifest::new()
        }
    };

    let payload = upload_all(store, &dirs, &mut manifest, &mut report, sink);
    report.payload_items = payload.len();
    sink.info(format!(
        "Uploaded {} file(s), {} failed",
        report.uploaded.len(),
        report.failures.len()
    ));

    if !live {
        sink.success(format!("Dry run complete: {} payload item(s)", report.payload_items));
        return Ok(report);
    }

    if let Err(e) = manifest.save(&manifest_path) {
        report.warn(sink, format!("Failed to save manifest: {}", e));
    }

    if config.api_url.trim().is_empty() {
        sink.info("No API URL configured, skipping catalog sync");
    } else {
        report.api = submit(config, &payload, sink).await;
    }

    if let ApiOutcome::Accepted { response } = &report.api {
        report.deleted = reconcile(store, &payload, &response.not_found, sink);
        let files = write_result_files(&config.results_dir(), response);
        match files {
            Ok(files) => report.result_files = files,
            Err(e) => report.warn(sink, format!("Failed to write API results: {}", e)),
        }
    }

    sink.success(format!("Upload complete: {}", report.remote_dir));
    Ok(report)
}

/// Create every segment of `path` in turn; existing segments are fine.
pub fn ensure_remote_dir<S: RemoteStore + ?Sized>(store: &mut S, path: &str) -> Result<(), RemoteError> {
    let mut current = String::new();
    let mut first_error = None;

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);

        match store.make_dir(&current) {
            Ok(()) | Err(RemoteError::AlreadyExists(_)) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Upload every file of every directory and build the catalog payload.
fn upload_all<S, L>(
    store: &mut S,
    dirs: &[PathBuf],
    manifest: &mut Manifest,
    report: &mut PublishReport,
    sink: &L,
) -> CatalogPayload
where
    S: RemoteStore + ?Sized,
    L: ProgressSink,
{
    let mut payload = CatalogPayload::new();

    for dir in dirs {
        for path in files_under(dir) {
            let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let remote = format!("{}/{}", report.remote_dir, filename);

            if let Err(e) = store.store(&remote, &path) {
                sink.error(format!("Failed to upload {}: {}", path.display(), e));
                report.failures.push(UploadFailure {
                    path,
                    message: e.to_string(),
                });
                continue;
            }
            report.uploaded.push(remote.clone());

            let Some(entry) = manifest.get_mut(&filename) else {
                continue;
            };
            entry.remote_path = format!("{}{}", PUBLIC_PATH_PREFIX, remote);

            let swatch_path = if entry.swatch_filename.is_empty() {
                String::new()
            } else {
                format!("{}{}/{}", PUBLIC_PATH_PREFIX, report.remote_dir, entry.swatch_filename)
            };
            payload.insert(
                filename,
                PayloadItem {
                    item_code: entry.item_code.clone(),
                    remote_path: entry.remote_path.clone(),
                    sort: entry.sort,
                    default_flag: entry.default_flag,
                    swatch_path,
                },
            );
        }
    }

    payload
}

/// Regular files under `dir`, sorted by name at each level.
fn files_under(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

async fn submit<L: ProgressSink>(config: &Config, payload: &CatalogPayload, sink: &L) -> ApiOutcome {
    sink.info(format!("Sending {} item(s) to {}", payload.len(), config.api_url));

    let result = match CatalogClient::new(config.api_url.trim(), &config.api_key) {
        Ok(client) => client.submit(payload).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => {
            sink.success(format!(
                "API answered '{}' {}: {} not found, {} color pic id(s), {} color id(s)",
                response.status,
                response.message,
                response.not_found.len(),
                response.color_pic_ids.len(),
                response.color_ids.len()
            ));
            ApiOutcome::Accepted { response }
        }
        Err(e) => {
            sink.error(format!("Catalog sync failed: {}", e));
            ApiOutcome::Failed { message: e.to_string() }
        }
    }
}

/// Write each non-empty id list to `<dir>/<label>_<YYYYMMDD_HHMMSS>.json`.
pub fn write_result_files(dir: &Path, response: &CatalogResponse) -> std::io::Result<Vec<PathBuf>> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut written = Vec::new();

    for (label, ids) in [
        (COLOR_PIC_IDS_LABEL, &response.color_pic_ids),
        (COLOR_IDS_LABEL, &response.color_ids),
    ] {
        if ids.is_empty() {
            continue;
        }
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}_{}.json", label, stamp));
        let content = serde_json::to_string_pretty(ids)?;
        fs::write(&path, content)?;
        written.push(path);
    }

    Ok(written)
}
