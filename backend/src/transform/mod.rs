//! Compress stage: resize and recompress every image in the SMALL folders.
//!
//! Each file is replaced in place through a sibling `<name>.tmp`, so a crash
//! mid-write never leaves a half-written original. JPEGs keep their ICC
//! profile: it is pulled from the source with [`icc::extract`] before decoding
//! and put back with [`icc::embed`] after encoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::api::logs::ProgressSink;
use crate::config::Config;
use crate::error::CompressError;
use crate::icc;
use crate::scan::{find_small_dirs, is_image_name, scan_dir_sorted};

/// Resize and encoding settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressOptions {
    /// Target width; 0 derives it from `height` and the aspect ratio.
    pub width: u32,
    /// Target height; 0 derives it from `width` and the aspect ratio.
    pub height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    /// Searched for SMALL folders when no directories are given.
    pub work_root: PathBuf,
}

impl CompressOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.width,
            height: config.height,
            quality: config.effective_quality(),
            work_root: config.work_path.clone(),
        }
    }

    /// Output size for an image of `width` x `height`.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |num: u32, den: u32, by: u32| -> u32 {
            if den == 0 {
                return by;
            }
            ((u64::from(num) * u64::from(by) + u64::from(den) / 2) / u64::from(den)).max(1) as u32
        };

        match (self.width, self.height) {
            (0, 0) => (width, height),
            (0, h) => (scale(width, height, h), h),
            (w, 0) => (w, scale(height, width, w)),
            (w, h) => (w, h),
        }
    }
}

/// A file that could not be compressed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// What the compress stage did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressReport {
    /// Files replaced with their recompressed version.
    pub compressed: Vec<PathBuf>,
    /// How many of those had an ICC profile re-embedded.
    pub profiles_kept: usize,
    pub failures: Vec<FileFailure>,
    /// Directories that could not be listed.
    pub skipped_dirs: Vec<PathBuf>,
}

/// Compress every image directly inside each of `target_dirs`.
///
/// An empty list means every SMALL folder under `options.work_root`.
/// Never fails as a whole: problems are logged and collected in the report.
pub fn compress<L: ProgressSink>(
    target_dirs: &[PathBuf],
    options: &CompressOptions,
    sink: &L,
) -> CompressReport {
    let dirs = if target_dirs.is_empty() {
        find_small_dirs(&options.work_root)
    } else {
        target_dirs.to_vec()
    };
    sink.info(format!(
        "Compressing {} folder(s) to {}x{} (quality {})",
        dirs.len(),
        options.width,
        options.height,
        options.quality
    ));

    let mut report = CompressReport::default();
    for dir in &dirs {
        let names = match scan_dir_sorted(dir) {
            Ok(names) => names,
            Err(e) => {
                sink.warning(format!("Cannot read {}: {}", dir.display(), e));
                report.skipped_dirs.push(dir.clone());
                continue;
            }
        };

        for name in names.iter().filter(|n| is_image_name(n)) {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            match compress_file(&path, options) {
                Ok(kept_profile) => {
                    if kept_profile {
                        report.profiles_kept += 1;
                    }
                    report.compressed.push(path);
                }
                Err(e) => {
                    sink.error(format!("Failed to compress {}: {}", path.display(), e));
                    report.failures.push(FileFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    if report.failures.is_empty() {
        sink.success(format!("Compressed {} image(s)", report.compressed.len()));
    } else {
        sink.warning(format!(
            "Compressed {} image(s), {} failed",
            report.compressed.len(),
            report.failures.len()
        ));
    }
    report
}

/// Recompress one file in place. Returns whether an ICC profile was kept.
pub fn compress_file(path: &Path, options: &CompressOptions) -> Result<bool, CompressError> {
    let original = fs::read(path)?;
    let profile = icc::extract(&original).ok().flatten();

    let img = image::load_from_memory(&original)?;
    let (width, height) = options.target_size(img.width(), img.height());
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    let (bytes, kept_profile) = if is_png(path) {
        (encode_png(&resized)?, false)
    } else {
        let encoded = encode_jpeg(&resized, options.quality)?;
        match profile {
            Some(profile) => match icc::embed(&encoded, &profile) {
                Ok(with_profile) => (with_profile, true),
                Err(_) => (encoded, false),
            },
            None => (encoded, false),
        }
    };

    replace_file(path, &bytes)?;
    Ok(kept_profile)
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError> {
    let mut buf = Vec::new();
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, CompressError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Write `bytes` to `<path>.tmp`, then rename over `path`.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), CompressError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let result = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(result?)
}
