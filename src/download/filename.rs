//! Destination path construction for listing photos.
//!
//! Files are named `<id>-<address><extension>` inside the output directory.
//! The address is used verbatim: an address containing a path separator or a
//! character the file system rejects produces a path that cannot be created,
//! which surfaces as a fatal IO error when the download is written.

use std::path::{Path, PathBuf};

use url::Url;

/// Builds the destination path for a record's photo.
///
/// ```
/// use house_downloader_core::download::destination_path;
/// use std::path::Path;
///
/// let path = destination_path(Path::new("images"), 42, "Oak St", "https://example.com/photo.jpg");
/// assert_eq!(path, Path::new("images/42-Oak St.jpg"));
/// ```
#[must_use]
pub fn destination_path(output_dir: &Path, id: i64, address: &str, photo_url: &str) -> PathBuf {
    output_dir.join(destination_file_name(id, address, photo_url))
}

/// Builds the bare file name `<id>-<address><extension>`.
#[must_use]
pub fn destination_file_name(id: i64, address: &str, photo_url: &str) -> String {
    let extension = extension_from_url(photo_url).unwrap_or_default();
    format!("{id}-{address}{extension}")
}

/// Returns the extension (including the dot) of the URL's trailing path segment.
///
/// Query strings and fragments are ignored. Returns `None` when the last
/// segment has no dot. The extension keeps its original case.
pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let last_segment = match Url::parse(url) {
        Ok(parsed) => parsed.path_segments()?.next_back()?.to_string(),
        Err(_) => raw_last_segment(url).to_string(),
    };
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index..];
    (ext.len() > 1).then(|| ext.to_string())
}

/// Last `/`-separated segment of a string that is not a parseable URL.
fn raw_last_segment(raw: &str) -> &str {
    let without_query = raw.split(['?', '#']).next().unwrap_or(raw);
    without_query.rsplit('/').next().unwrap_or(without_query)
}
