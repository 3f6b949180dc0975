//! Directory scanning in photo-shoot order.
//!
//! Camera exports and OS "copy" operations number files as `IMG (2).jpg`,
//! `IMG (12).jpg`. A plain directory listing puts `(12)` before `(2)`;
//! [`natural_cmp`] restores shot order for image names carrying a trailing
//! parenthesized number and leaves every other name in byte order.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the per-item folder holding images to compress and upload.
pub const SMALL_DIR: &str = "SMALL";

/// True for `.jpg` / `.png` names (case-insensitive).
pub fn is_image_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".png")
}

/// The integer between the last `(` and the last `)` of a name.
fn paren_number(name: &str) -> Option<i64> {
    let open = name.rfind('(')?;
    let close = name.rfind(')')?;
    if close <= open {
        return None;
    }
    name[open + 1..close].parse().ok()
}

/// Compare two entry names in shot order.
///
/// Both image-like with a parenthesized number: numeric order. Otherwise,
/// or when the numbers tie: byte-wise order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    if is_image_name(a) && is_image_name(b) {
        if let (Some(na), Some(nb)) = (paren_number(a), paren_number(b)) {
            return na.cmp(&nb).then_with(|| a.cmp(b));
        }
    }
    a.cmp(b)
}

/// List every entry name in `dir`, sorted with [`natural_cmp`].
pub fn scan_dir_sorted(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(sort_natural(names))
}

/// Stable merge sort with [`natural_cmp`].
///
/// `natural_cmp` is not transitive across numbered and plain names
/// (`z(1).jpg < a(5).jpg < m.jpg < z(1).jpg`), so `slice::sort_by` may
/// panic on it. Merging only ever compares two heads and always terminates.
pub fn sort_natural(mut names: Vec<String>) -> Vec<String> {
    if names.len() <= 1 {
        return names;
    }
    let right = sort_natural(names.split_off(names.len() / 2));
    let left = sort_natural(names);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if natural_cmp(r, l) == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    merged
}

/// Image file names in `dir`, in shot order.
pub fn list_images(dir: &Path) -> io::Result<Vec<String>> {
    let names = scan_dir_sorted(dir)?;
    Ok(names
        .into_iter()
        .filter(|name| is_image_name(name) && dir.join(name).is_file())
        .collect())
}

/// Find every `SMALL` directory (case-insensitive) under `root`.
///
/// Matched directories are not descended into. Unreadable entries are skipped.
pub fn find_small_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if entry.file_type().is_dir()
            && entry.file_name().to_string_lossy().eq_ignore_ascii_case(SMALL_DIR)
        {
            dirs.push(entry.into_path());
            walker.skip_current_dir();
        }
    }
    dirs
}
