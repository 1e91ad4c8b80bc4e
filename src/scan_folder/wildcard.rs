use crate::path_utils::to_forward_slashes;
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::{error, warn};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Case-insensitive glob match of every entry under `source_folder` against `relative_pattern`.
///
/// The pattern is matched against the entry's path relative to `source_folder`. `*` may span
/// directory levels. Returned paths are absolute with forward slashes.
pub fn find_wildcard_matches(
    source_folder: &str,
    relative_pattern: &str,
    include_folders: bool,
    recursive: bool,
) -> Vec<String> {
    find_wildcard_matches_excluding(source_folder, relative_pattern, &[], include_folders, recursive)
}

/// Same as [`find_wildcard_matches`], without descending into any of `excluded_folders`.
pub fn find_wildcard_matches_excluding(
    source_folder: &str,
    relative_pattern: &str,
    excluded_folders: &[String],
    include_folders: bool,
    recursive: bool,
) -> Vec<String> {
    if relative_pattern.is_empty() {
        return Vec::new();
    }

    let pattern = match Pattern::new(&to_forward_slashes(relative_pattern)) {
        Ok(pattern) => pattern,
        Err(e) => {
            error!("Invalid wildcard pattern '{}': {}", relative_pattern, e);
            return Vec::new();
        }
    };

    let root = Path::new(source_folder);
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut matches = Vec::new();
    let entries = walker.into_iter().filter_entry(|entry| {
        let path = to_forward_slashes(&entry.path().to_string_lossy());
        !excluded_folders.iter().any(|excluded| *excluded == path)
    });

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error reading entry under {}: {}", source_folder, err);
                continue;
            }
        };

        if entry.path_is_symlink() {
            continue;
        }
        if !include_folders && !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = to_forward_slashes(&relative.to_string_lossy());

        if pattern.matches_with(&relative, MATCH_OPTIONS) {
            matches.push(to_forward_slashes(&entry.path().to_string_lossy()));
        }
    }

    matches
}
