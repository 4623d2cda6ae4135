//! Output file naming: derive a name from the URL, sanitize it and avoid
//! clobbering existing files.

use std::path::{Component, Path, PathBuf};

use url::Url;

/// Name used when the URL yields nothing usable.
pub const FALLBACK_FILENAME: &str = "download.bin";

/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// File name taken from the last path segment of `url`, percent-decoded and
/// sanitized. Falls back to [`FALLBACK_FILENAME`].
#[must_use]
pub fn filename_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return FALLBACK_FILENAME.to_string();
    };
    let Some(last) = parsed.path_segments().and_then(|mut s| s.next_back()) else {
        return FALLBACK_FILENAME.to_string();
    };
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    let name = sanitize_filename(decoded.trim());
    if name.trim_matches('_').is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        name
    }
}

/// First path under `dir` named `filename` that does not exist yet.
///
/// Conflicts get a numeric suffix before the extension: `file.iso`, then
/// `file_1.iso`, `file_2.iso`, ...
#[must_use]
pub fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let filename = {
        let sanitized = sanitize_filename(filename);
        if sanitized.trim_matches('_').is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            sanitized
        }
    };
    let base_path = dir.join(&filename);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename.as_str(), ""),
    };

    for i in 1..1000 {
        let candidate = dir.join(format!("{stem}_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}_{timestamp}{ext}"))
}

/// Output path for `url` when the caller did not choose one.
#[must_use]
pub fn default_output_path(url: &str, dir: &Path) -> PathBuf {
    resolve_unique_path(dir, &filename_from_url(url))
}
