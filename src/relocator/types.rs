use crate::path_utils::{join, normalize_file_path};
use crate::scan_folder::{PlatformConfig, ScanFolderInfo};
use crate::storage::models::{
    ProductDatabaseEntry, ProductDependencyDatabaseEntry, SourceDatabaseEntry,
    SourceFileDependencyEntry,
};
use ahash::AHashSet;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelocationStatus {
    #[default]
    None,
    Failed,
    Succeeded,
}

/// One file affected by a move or delete.
#[derive(Debug, Clone)]
pub struct SourceFileRelocationInfo {
    pub source_entry: SourceDatabaseEntry,
    /// Products of the source keyed by sub id.
    pub products: BTreeMap<i32, ProductDatabaseEntry>,
    pub source_dependency_entries: Vec<SourceFileDependencyEntry>,
    pub product_dependency_entries: Vec<ProductDependencyDatabaseEntry>,
    pub old_relative_path: String,
    pub new_relative_path: String,
    pub old_absolute_path: String,
    pub new_absolute_path: String,
    pub new_uuid: Uuid,
    pub operation_status: RelocationStatus,
    /// Index into the configured metadata types when this entry is a companion file.
    pub metadata_index: Option<usize>,
    /// Index of the owning source in the same container, for companion files.
    pub source_file_index: Option<usize>,
    pub scan_folder_path: String,
    pub has_path_dependencies: bool,
    pub is_metadata_enabled_type: bool,
}

impl SourceFileRelocationInfo {
    pub fn from_source(
        source_entry: SourceDatabaseEntry,
        products: BTreeMap<i32, ProductDatabaseEntry>,
        scan_folder: &ScanFolderInfo,
        is_metadata_enabled_type: bool,
    ) -> Self {
        let old_relative_path = normalize_file_path(&source_entry.source_name);
        let old_absolute_path = join(scan_folder.scan_path(), &old_relative_path);
        Self {
            source_entry,
            products,
            source_dependency_entries: Vec::new(),
            product_dependency_entries: Vec::new(),
            old_relative_path,
            new_relative_path: String::new(),
            old_absolute_path,
            new_absolute_path: String::new(),
            new_uuid: Uuid::nil(),
            operation_status: RelocationStatus::None,
            metadata_index: None,
            source_file_index: None,
            scan_folder_path: scan_folder.scan_path().to_string(),
            has_path_dependencies: false,
            is_metadata_enabled_type,
        }
    }

    /// A companion file, which has no database row of its own.
    pub fn from_metadata_file(
        absolute_path: &str,
        scan_folder: &ScanFolderInfo,
        metadata_index: usize,
        source_file_index: Option<usize>,
    ) -> Self {
        let absolute_path = normalize_file_path(absolute_path);
        let relative = PlatformConfig::convert_to_relative_path(&absolute_path, scan_folder, false);
        let mut info = Self::from_source(
            SourceDatabaseEntry::placeholder(scan_folder.scan_folder_id(), &relative),
            BTreeMap::new(),
            scan_folder,
            false,
        );
        info.old_absolute_path = absolute_path;
        info.metadata_index = Some(metadata_index);
        info.source_file_index = source_file_index;
        info
    }

    pub fn is_metadata_file(&self) -> bool {
        self.metadata_index.is_some()
    }

    pub fn has_dependencies(&self) -> bool {
        !self.source_dependency_entries.is_empty() || !self.product_dependency_entries.is_empty()
    }
}

pub type SourceFileRelocationContainer = Vec<SourceFileRelocationInfo>;

/// Text substitutions to apply to one file. `old_strings[i]` is replaced by `new_strings[i]`.
#[derive(Debug, Clone)]
pub struct FileUpdateTask {
    pub old_strings: Vec<String>,
    pub new_strings: Vec<String>,
    pub abs_path_file_to_update: String,
    pub from_asset_id: bool,
    pub succeeded: bool,
    pub skip_task: bool,
}

impl FileUpdateTask {
    pub fn new(
        old_strings: Vec<String>,
        new_strings: Vec<String>,
        abs_path_file_to_update: String,
        from_asset_id: bool,
        skip_task: bool,
    ) -> Self {
        Self {
            old_strings,
            new_strings,
            abs_path_file_to_update,
            from_asset_id,
            succeeded: false,
            skip_task,
        }
    }

    fn identity(&self) -> TaskIdentity {
        (
            self.from_asset_id,
            self.abs_path_file_to_update.clone(),
            self.old_strings.clone(),
            self.new_strings.clone(),
        )
    }
}

type TaskIdentity = (bool, String, Vec<String>, Vec<String>);

/// Insertion-ordered set of update tasks. Two tasks with the same target, strings and
/// reference kind are the same task regardless of their outcome flags.
#[derive(Debug, Clone, Default)]
pub struct FileUpdateTasks {
    tasks: Vec<FileUpdateTask>,
    seen: AHashSet<TaskIdentity>,
}

impl FileUpdateTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an identical task is already present.
    pub fn insert(&mut self, task: FileUpdateTask) -> bool {
        if !self.seen.insert(task.identity()) {
            return false;
        }
        self.tasks.push(task);
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileUpdateTask> {
        self.tasks.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, FileUpdateTask> {
        self.tasks.iter_mut()
    }

    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.succeeded).count()
    }
}

impl<'a> IntoIterator for &'a FileUpdateTasks {
    type Item = &'a FileUpdateTask;
    type IntoIter = std::slice::Iter<'a, FileUpdateTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocationFlags {
    /// Resolve and report only; nothing on disk changes.
    pub preview_only: bool,
    pub allow_dependency_breaking: bool,
    pub remove_empty_folders: bool,
    pub update_references: bool,
    pub exclude_metadata_files: bool,
    /// Also operate on files that have no source row in the database.
    pub allow_non_database_files: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RelocationSuccess {
    pub move_success_count: usize,
    pub move_failure_count: usize,
    pub move_total_count: usize,
    pub update_success_count: usize,
    pub update_failure_count: usize,
    pub update_total_count: usize,
    pub relocation_container: SourceFileRelocationContainer,
    pub update_tasks: FileUpdateTasks,
}

impl RelocationSuccess {
    pub fn new(
        relocation_container: SourceFileRelocationContainer,
        error_count: usize,
        update_tasks: FileUpdateTasks,
    ) -> Self {
        let move_total_count = relocation_container.len();
        let move_failure_count = error_count.min(move_total_count);
        let update_total_count = update_tasks.len();
        let update_success_count = update_tasks.success_count();
        Self {
            move_success_count: move_total_count - move_failure_count,
            move_failure_count,
            move_total_count,
            update_success_count,
            update_failure_count: update_total_count - update_success_count,
            update_total_count,
            relocation_container,
            update_tasks,
        }
    }
}

/// Request-level failure. Nothing on disk has been changed when one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct MoveFailure {
    pub reason: String,
    /// The request was refused because it would leave dependencies pointing at missing files.
    pub dependency_failure: bool,
}

impl MoveFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            dependency_failure: false,
        }
    }

    pub fn dependency(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            dependency_failure: true,
        }
    }
}

/// Guid in the `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` form used in asset references.
pub fn guid_string(uuid: &Uuid) -> String {
    format!("{{{}}}", uuid.hyphenated().to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(path: &str, from_asset_id: bool) -> FileUpdateTask {
        FileUpdateTask::new(
            vec!["old".into()],
            vec!["new".into()],
            path.to_string(),
            from_asset_id,
            false,
        )
    }

    #[test]
    fn test_identical_tasks_collapse() {
        let mut tasks = FileUpdateTasks::new();
        assert!(tasks.insert(task("/root/a.txt", false)));
        let mut skipped = task("/root/a.txt", false);
        skipped.skip_task = true;
        assert!(!tasks.insert(skipped));
        assert!(tasks.insert(task("/root/a.txt", true)));
        assert!(tasks.insert(task("/root/b.txt", false)));
        assert_eq!(tasks.len(), 3);
        assert!(!tasks.iter().any(|t| t.skip_task));
    }

    #[test]
    fn test_guid_string_format() {
        let uuid = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        assert_eq!(guid_string(&uuid), "{01234567-89AB-CDEF-0123-456789ABCDEF}");
    }
}
