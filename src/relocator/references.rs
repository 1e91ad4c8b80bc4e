use super::types::{
    guid_string, FileUpdateTask, FileUpdateTasks, RelocationStatus, SourceFileRelocationContainer,
    SourceFileRelocationInfo,
};
use super::SourceFileRelocator;
use crate::file_io::FileIo;
use crate::path_utils::{eq_ignore_case, extension, file_stem, join, normalize_file_path, replace_extension};
use crate::source_control::wait_for_response;
use crate::storage::models::{ProductDependencyDatabaseEntry, SourceDatabaseEntry};
use ahash::AHashMap;
use regex::bytes::{NoExpand, Regex};
use tracing::{debug, error, warn};

/// Old absolute path (lower-cased) to new absolute path for every entry that moved.
type MovedMap = AHashMap<String, String>;

fn moved_key(path: &str) -> String {
    normalize_file_path(path).to_lowercase()
}

fn remap(moved: &MovedMap, path: &str) -> String {
    moved
        .get(&moved_key(path))
        .cloned()
        .unwrap_or_else(|| path.to_string())
}

/// Old and new strings for a product reference: the product path (conventionally
/// lower-case), the source path as a fallback and the source guid.
pub fn compute_product_dependency_update_paths(
    info: &SourceFileRelocationInfo,
    product_name: &str,
) -> (Vec<String>, Vec<String>) {
    let with_product_extension = |relative: &str| match extension(product_name) {
        Some(ext) => replace_extension(relative, ext).to_lowercase(),
        None => relative.to_lowercase(),
    };

    let old_strings = vec![
        with_product_extension(&info.old_relative_path),
        info.old_relative_path.clone(),
        guid_string(&info.source_entry.source_guid),
    ];
    let new_strings = vec![
        with_product_extension(&info.new_relative_path),
        info.new_relative_path.clone(),
        guid_string(&info.new_uuid),
    ];
    (old_strings, new_strings)
}

/// Applies every substitution of `task` to its file. Returns true only when at least one old
/// string was found and the file was written back.
pub fn update_file_references(io: &dyn FileIo, task: &FileUpdateTask) -> bool {
    if task.skip_task {
        return false;
    }

    // Dependent files may be binary, so the substitution works on raw bytes.
    let contents = match io.read(&task.abs_path_file_to_update) {
        Ok(contents) if !contents.is_empty() => contents,
        Ok(_) => return false,
        Err(e) => {
            error!("Failed to read {}: {}", task.abs_path_file_to_update, e);
            return false;
        }
    };

    let mut updated = contents.clone();
    for (old, new) in task.old_strings.iter().zip(&task.new_strings) {
        if old.is_empty() {
            continue;
        }
        let pattern = match Regex::new(&regex::escape(old)) {
            Ok(pattern) => pattern,
            Err(e) => {
                error!("Cannot search {} for {}: {}", task.abs_path_file_to_update, old, e);
                continue;
            }
        };
        if pattern.is_match(&updated) {
            updated = pattern
                .replace_all(&updated, NoExpand(new.as_bytes()))
                .into_owned();
        }
    }

    let succeeded = updated != contents
        && match io.write(&task.abs_path_file_to_update, &updated) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to write {}: {}", task.abs_path_file_to_update, e);
                false
            }
        };

    debug!(
        "Updated {} - {}",
        task.abs_path_file_to_update,
        if succeeded { "SUCCESS" } else { "FAIL" }
    );
    succeeded
}

impl SourceFileRelocator {
    /// Builds one rewrite task per dependent file of every relocated entry and applies them.
    /// Must run after the whole batch has been moved.
    pub fn update_references(&self, container: &SourceFileRelocationContainer) -> FileUpdateTasks {
        let moved: MovedMap = container
            .iter()
            .filter(|info| info.operation_status == RelocationStatus::Succeeded)
            .map(|info| (moved_key(&info.old_absolute_path), info.new_absolute_path.clone()))
            .collect();

        let mut tasks = FileUpdateTasks::new();

        for info in container {
            let skip = info.operation_status == RelocationStatus::Failed;

            for dependency in &info.source_dependency_entries {
                let Some(dependent) = self.lookup_source_by_guid(dependency) else {
                    continue;
                };
                let Some(found) = self.config.find_first_matching_file(&dependent.source_name) else {
                    warn!(
                        "Dependent file {} could not be found; its references will not be updated",
                        dependent.source_name
                    );
                    continue;
                };

                tasks.insert(FileUpdateTask::new(
                    vec![
                        guid_string(&info.source_entry.source_guid),
                        info.old_relative_path.clone(),
                    ],
                    vec![guid_string(&info.new_uuid), info.new_relative_path.clone()],
                    remap(&moved, &found),
                    dependency.from_asset_id,
                    skip,
                ));
            }

            for dependency in &info.product_dependency_entries {
                if let Some(task) = self.product_dependency_task(info, dependency, &moved, skip) {
                    tasks.insert(task);
                }
            }
        }

        if self.source_control.is_active() && !tasks.is_empty() {
            let paths: Vec<String> = tasks
                .iter()
                .map(|task| task.abs_path_file_to_update.clone())
                .collect();
            let pending = self.source_control.edit_bulk(&paths);
            if wait_for_response(&pending, self.timeout).is_err() {
                return tasks;
            }
        }

        let io = self.config.file_io();
        for task in tasks.iter_mut() {
            task.succeeded = update_file_references(io.as_ref(), task);
        }

        tasks
    }

    fn product_dependency_task(
        &self,
        info: &SourceFileRelocationInfo,
        dependency: &ProductDependencyDatabaseEntry,
        moved: &MovedMap,
        skip: bool,
    ) -> Option<FileUpdateTask> {
        let Some(product) = info.products.get(&dependency.dependency_sub_id) else {
            warn!(
                "Product with sub id {} of {} not found; dependency of product {} will not be updated",
                dependency.dependency_sub_id, info.old_relative_path, dependency.product_pk
            );
            return None;
        };

        if !eq_ignore_case(file_stem(&product.product_name), file_stem(&info.old_absolute_path)) {
            warn!(
                "Product {} does not share a name with {}; references to it cannot be fixed automatically",
                product.product_name, info.old_relative_path
            );
            return None;
        }

        let dependent = match self.db.first_source_by_product_id(dependency.product_pk) {
            Ok(Some(source)) => source,
            Ok(None) => return None,
            Err(e) => {
                error!("Source lookup failed for product {}: {}", dependency.product_pk, e);
                return None;
            }
        };

        let scan_path = self.scan_folder_path_for(&dependent)?;
        let target = join(&scan_path, &dependent.source_name);
        let (old_strings, new_strings) =
            compute_product_dependency_update_paths(info, &product.product_name);

        Some(FileUpdateTask::new(
            old_strings,
            new_strings,
            remap(moved, &target),
            dependency.from_asset_id,
            skip,
        ))
    }

    fn lookup_source_by_guid(
        &self,
        dependency: &crate::storage::models::SourceFileDependencyEntry,
    ) -> Option<SourceDatabaseEntry> {
        match self.db.first_source_by_guid(&dependency.source_guid) {
            Ok(source) => source,
            Err(e) => {
                error!("Source lookup failed for {}: {}", dependency.source_guid, e);
                None
            }
        }
    }

    fn scan_folder_path_for(&self, source: &SourceDatabaseEntry) -> Option<String> {
        if let Some(folder) = self.config.scan_folder_by_id(source.scan_folder_id) {
            return Some(folder.scan_path().to_string());
        }
        match self.db.query_scan_folder_by_id(source.scan_folder_id) {
            Ok(mut rows) => rows.next().map(|row| row.scan_folder),
            Err(e) => {
                error!("Scan folder lookup failed for {}: {}", source.scan_folder_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_io::LocalFileIo;
    use crate::path_utils::to_forward_slashes;
    use crate::scan_folder::ScanFolderInfo;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[test]
    fn test_rewrites_every_pair() {
        let tmp = tempdir().unwrap();
        let path = to_forward_slashes(&tmp.path().join("dep.txt").to_string_lossy());
        fs::write(&path, "ref a/b.txt and {GUID} and a/b.txt").unwrap();

        let task = FileUpdateTask::new(
            vec!["a/b.txt".into(), "{GUID}".into()],
            vec!["c/d.txt".into(), "{NEW}".into()],
            path.clone(),
            false,
            false,
        );
        assert!(update_file_references(&LocalFileIo, &task));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "ref c/d.txt and {NEW} and c/d.txt"
        );
    }

    #[test]
    fn test_rewrites_binary_file() {
        let tmp = tempdir().unwrap();
        let path = to_forward_slashes(&tmp.path().join("level.bin").to_string_lossy());
        let mut contents = vec![0xff, 0xfe, 0x00];
        contents.extend_from_slice(b"a/b.txt");
        contents.extend_from_slice(&[0x80, 0x00]);
        fs::write(&path, &contents).unwrap();

        let task = FileUpdateTask::new(
            vec!["a/b.txt".into()],
            vec!["c/$1.txt".into()],
            path.clone(),
            false,
            false,
        );
        assert!(update_file_references(&LocalFileIo, &task));

        let mut expected = vec![0xff, 0xfe, 0x00];
        expected.extend_from_slice(b"c/$1.txt");
        expected.extend_from_slice(&[0x80, 0x00]);
        assert_eq!(fs::read(&path).unwrap(), expected);
    }

    #[test]
    fn test_no_match_leaves_file_untouched() {
        let tmp = tempdir().unwrap();
        let path = to_forward_slashes(&tmp.path().join("dep.txt").to_string_lossy());
        fs::write(&path, "nothing to see").unwrap();

        let task = FileUpdateTask::new(vec!["x".into()], vec!["y".into()], path.clone(), false, false);
        assert!(!update_file_references(&LocalFileIo, &task));
        assert_eq!(fs::read_to_string(&path).unwrap(), "nothing to see");
    }

    #[test]
    fn test_skipped_task_is_not_applied() {
        let tmp = tempdir().unwrap();
        let path = to_forward_slashes(&tmp.path().join("dep.txt").to_string_lossy());
        fs::write(&path, "x").unwrap();

        let task = FileUpdateTask::new(vec!["x".into()], vec!["y".into()], path.clone(), false, true);
        assert!(!update_file_references(&LocalFileIo, &task));
        assert_eq!(fs::read_to_string(&path).unwrap(), "x");
    }

    #[test]
    fn test_product_paths_use_product_extension() {
        let folder = ScanFolderInfo::new("/root", "root", "root");
        let mut info = SourceFileRelocationInfo::from_source(
            SourceDatabaseEntry {
                source_id: 1,
                scan_folder_id: 1,
                source_name: "Textures/Wood.png".into(),
                source_guid: Uuid::nil(),
            },
            BTreeMap::new(),
            &folder,
            false,
        );
        info.new_relative_path = "Textures/Oak.png".into();
        info.new_uuid = Uuid::nil();

        let (old, new) = compute_product_dependency_update_paths(&info, "pc/textures/wood.dds");
        assert_eq!(old[0], "textures/wood.dds");
        assert_eq!(old[1], "Textures/Wood.png");
        assert_eq!(new[0], "textures/oak.dds");
        assert_eq!(new[1], "Textures/Oak.png");
    }
}
