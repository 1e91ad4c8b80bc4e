//! Discovering the on-disk case of a path.
//!
//! A plain existence check on a case-insensitive volume happily accepts the wrong case, and on a
//! case-sensitive one it rejects a path that differs only by case. Both are resolved here by
//! reading the actual directory listings one component at a time.

use crate::file_io::FileIo;
use crate::path_utils::{normalize_file_path, SEPARATOR};

pub fn host_is_case_sensitive() -> bool {
    !cfg!(any(windows, target_os = "macos"))
}

fn child_path(dir: &str, name: &str) -> String {
    if dir.ends_with(SEPARATOR) {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Returns `relative` rewritten to the case the entries actually have under `root`, or `None`
/// when some component does not exist in any case.
pub fn update_to_correct_case(io: &dyn FileIo, root: &str, relative: &str) -> Option<String> {
    let relative = normalize_file_path(relative);
    let mut current = root.to_string();
    let mut corrected: Vec<String> = Vec::new();

    for segment in relative.split(SEPARATOR).filter(|s| !s.is_empty() && *s != ".") {
        let entries = io.list_dir(&current).ok()?;

        let found = entries
            .iter()
            .find(|entry| entry.as_str() == segment)
            .or_else(|| {
                let lower = segment.to_lowercase();
                entries.iter().find(|entry| entry.to_lowercase() == lower)
            })?
            .clone();

        current = child_path(&current, &found);
        corrected.push(found);
    }

    Some(corrected.join("/"))
}

/// Case-corrects every component of an absolute path.
pub fn correct_absolute_case(io: &dyn FileIo, absolute_path: &str) -> Option<String> {
    let normalized = normalize_file_path(absolute_path);

    let (root, rest) = if let Some(rest) = normalized.strip_prefix(SEPARATOR) {
        ("/".to_string(), rest.to_string())
    } else {
        let bytes = normalized.as_bytes();
        if bytes.len() >= 2 && bytes[1] == b':' {
            let rest = normalized.get(2..).unwrap_or("").trim_start_matches(SEPARATOR);
            (format!("{}/", &normalized[..2]), rest.to_string())
        } else {
            return None;
        }
    };

    if rest.is_empty() {
        return io.exists(&root).then_some(root);
    }

    let corrected = update_to_correct_case(io, &root, &rest)?;
    Some(format!("{}{}", root, corrected))
}
