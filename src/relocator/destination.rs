use super::types::SourceFileRelocationContainer;
use super::SourceFileRelocator;
use crate::path_utils::{
    create_safe_source_uuid, file_name, is_relative, join, normalize_file_path, replace_extension,
    to_forward_slashes, SEPARATOR,
};
use crate::scan_folder::{PlatformConfig, ScanFolderInfo};
use ahash::AHashMap;
use regex::RegexBuilder;
use tracing::warn;

lazy_static::lazy_static! {
    static ref SPECIAL_CHARACTERS: regex::Regex =
        regex::Regex::new(r"[.?^$+(){}\[\]\-]").expect("escape pattern is valid");
}

/// Characters the regex engine treats specially that the escape set above leaves alone.
const UNESCAPED_METACHARACTERS: [char; 2] = ['|', '\\'];

pub const ERR_CROSS_DIRECTORY: &str = "Wildcard cannot match across directory levels.  Please simplify your search or put a wildcard at the end of the search to match across directories.\n";

/// Expands the `*`s of `destination` with whatever each `*` of `abs_search` matched in
/// `abs_file`. Only the last wildcard may match across directory levels. When the search does
/// not match the file at all the destination is returned unchanged.
pub fn handle_wildcard(abs_file: &str, abs_search: &str, destination: &str) -> Result<String, String> {
    if let Some(bad) = abs_search.chars().find(|c| UNESCAPED_METACHARACTERS.contains(c)) {
        warn!("Wildcard search {} contains unsupported character '{}'", abs_search, bad);
        return Err(format!(
            "Search path contains the character '{}', which is not supported in a wildcard search.\n",
            bad
        ));
    }

    let escaped = SPECIAL_CHARACTERS.replace_all(abs_search, r"\$0");
    let search_as_regex = escaped.replace('*', "(.*)");

    let regex = RegexBuilder::new(&search_as_regex)
        .case_insensitive(true)
        .build()
        .map_err(|e| format!("Failed to build wildcard search for {}: {}\n", abs_search, e))?;

    let mut destination = destination.to_string();
    let Some(captures) = regex.captures(abs_file) else {
        return Ok(destination);
    };

    let group_count = captures.len();
    for i in 1..group_count {
        let matched = captures.get(i).map(|m| m.as_str()).unwrap_or_default();

        if matched.contains(SEPARATOR) && i < group_count - 1 {
            return Err(ERR_CROSS_DIRECTORY.to_string());
        }

        if let Some(pos) = destination.find('*') {
            destination.replace_range(pos..pos + 1, matched);
        }
    }

    Ok(destination)
}

/// A destination ending in a separator names a folder; the source's file name is appended.
pub fn fix_destination_missing_filename(destination: &str, source: &str) -> String {
    if destination.ends_with(SEPARATOR) {
        format!("{}{}", destination, file_name(source))
    } else {
        destination.to_string()
    }
}

impl SourceFileRelocator {
    /// Fills in the new paths and uuid of every entry and returns the destination scan folder.
    pub fn compute_destination(
        &self,
        container: &mut SourceFileRelocationContainer,
        source_scan_folder: &ScanFolderInfo,
        source: &str,
        destination: &str,
    ) -> Result<ScanFolderInfo, String> {
        if destination.contains("..") {
            return Err("Destination cannot contain any path navigation.  Please specify an absolute or relative path that does not contain ..\n".to_string());
        }

        let destination = fix_destination_missing_filename(&to_forward_slashes(destination), source);

        if destination.contains(['<', '|', '>', '?', '"']) {
            return Err("Destination string contains invalid characters.\n".to_string());
        }

        let mut destination_scan_folder = None;
        if !is_relative(&destination) {
            match self.config.scan_folder_for_file(&destination) {
                Some(folder) => destination_scan_folder = Some(folder.clone()),
                None => return Err("Destination must exist within a scanfolder.\n".to_string()),
            }
        }

        if source.contains('?') {
            return Err("Single character wildcards (?) are not supported when moving files.  Please use * instead.\n".to_string());
        }

        let source_wildcards = source.matches('*').count();
        let destination_wildcards = destination.matches('*').count();
        if source_wildcards != destination_wildcards {
            return Err("Source and destination paths must have the same number of wildcards.\n".to_string());
        }

        let selection_absolute = if is_relative(source) {
            to_forward_slashes(&join(source_scan_folder.scan_path(), source))
        } else {
            to_forward_slashes(source)
        };

        for index in 0..container.len() {
            let owner = container[index].source_file_index;
            let new_destination = match (owner, container[index].metadata_index) {
                (Some(owner), Some(metadata_index)) => {
                    let owner_destination = &container[owner].new_absolute_path;
                    let metadata = self
                        .config
                        .metadata_type_at(metadata_index)
                        .ok_or_else(|| format!("Unknown metadata type index {}\n", metadata_index))?;
                    if metadata.replaces_extension() {
                        replace_extension(owner_destination, &metadata.metadata_extension)
                    } else {
                        format!("{}.{}", owner_destination, metadata.metadata_extension)
                    }
                }
                _ => {
                    let old_absolute = to_forward_slashes(&join(
                        source_scan_folder.scan_path(),
                        &container[index].old_relative_path,
                    ));
                    let expanded = handle_wildcard(&old_absolute, &selection_absolute, &destination)?;
                    normalize_file_path(&expanded)
                }
            };

            let entry = &mut container[index];
            if is_relative(&new_destination) {
                let folder = destination_scan_folder.get_or_insert_with(|| source_scan_folder.clone());
                entry.new_relative_path = new_destination;
                entry.new_absolute_path = join(folder.scan_path(), &entry.new_relative_path);
            } else {
                let Some(folder) = self.config.scan_folder_for_file(&new_destination) else {
                    return Err(format!(
                        "Destination {} must exist within a scanfolder.\n",
                        new_destination
                    ));
                };
                entry.new_relative_path =
                    PlatformConfig::convert_to_relative_path(&new_destination, folder, false);
                entry.new_absolute_path = new_destination;
            }

            entry.new_relative_path = normalize_file_path(&entry.new_relative_path);
            entry.new_absolute_path = normalize_file_path(&entry.new_absolute_path);
            entry.new_uuid = create_safe_source_uuid(&entry.new_relative_path);
        }

        let mut claimed = AHashMap::new();
        for entry in container.iter() {
            let key = entry.new_absolute_path.to_lowercase();
            if let Some(other) = claimed.insert(key, &entry.old_absolute_path) {
                return Err(format!(
                    "Multiple files would be moved to {}.  Please make sure every file has a unique destination.\nFile 1: {}\nFile 2: {}\n",
                    entry.new_absolute_path, other, entry.old_absolute_path
                ));
            }
        }

        Ok(destination_scan_folder.unwrap_or_else(|| source_scan_folder.clone()))
    }
}
