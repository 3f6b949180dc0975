//! Remove uploads the catalog rejected.
//!
//! Every payload item whose item code comes back in `not_found_sns` has its
//! main image deleted (failures logged) and its swatch deleted (failures
//! ignored, swatches are shared between images of a row). Each remote path
//! is deleted at most once.

use std::collections::HashSet;

use super::remote::RemoteStore;
use crate::api::logs::ProgressSink;
use crate::config::PUBLIC_PATH_PREFIX;
use crate::models::CatalogPayload;

/// Public path (`/image/...`) to store path.
pub fn store_path(public: &str) -> &str {
    public.strip_prefix(PUBLIC_PATH_PREFIX).unwrap_or(public)
}

/// Delete rejected uploads. Returns the store paths actually deleted.
pub fn reconcile<S, L>(store: &mut S, payload: &CatalogPayload, not_found: &[String], sink: &L) -> Vec<String>
where
    S: RemoteStore + ?Sized,
    L: ProgressSink,
{
    if not_found.is_empty() {
        return Vec::new();
    }
    let rejected: HashSet<&str> = not_found.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut deleted = Vec::new();

    for (filename, item) in payload {
        if !rejected.contains(item.item_code.as_str()) {
            continue;
        }

        let main = store_path(&item.remote_path);
        if seen.insert(main) {
            match store.delete(main) {
                Ok(()) => {
                    sink.info(format!("Deleted {} (item {} not in catalog)", filename, item.item_code));
                    deleted.push(main.to_string());
                }
                Err(e) => sink.error(format!("Failed to delete {}: {}", main, e)),
            }
        }

        if item.swatch_path.is_empty() {
            continue;
        }
        let swatch = store_path(&item.swatch_path);
        if seen.insert(swatch) && store.delete(swatch).is_ok() {
            deleted.push(swatch.to_string());
        }
    }

    if !deleted.is_empty() {
        sink.warning(format!(
            "Removed {} file(s) for {} unknown item code(s)",
            deleted.len(),
            rejected.len()
        ));
    }
    deleted
}
