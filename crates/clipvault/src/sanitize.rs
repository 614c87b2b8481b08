//! Keeps directory layout out of span attributes and log fields.

use std::path::Path;

/// The final component of `path`, or `<unknown>` when there is none.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<unknown>".to_string())
}
