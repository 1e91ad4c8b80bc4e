use super::destination::fix_destination_missing_filename;
use super::types::{RelocationStatus, SourceFileRelocationContainer};
use super::SourceFileRelocator;
use crate::file_io::FileIo;
use crate::path_utils::{
    eq_ignore_case, is_relative, join, normalize_file_path, parent, starts_with_ignore_case,
    to_forward_slashes,
};
use crate::scan_folder::ScanFolderInfo;
use crate::source_control::{wait_for_response, ScResponse, SourceControlFlag, SourceControlStatus};
use std::ops::Range;
use tracing::{error, info, warn};

fn to_absolute_path(path: &str, scan_folder: &ScanFolderInfo) -> String {
    if is_relative(path) {
        join(scan_folder.scan_path(), path)
    } else {
        path.to_string()
    }
}

/// Applies a source control response to the entries in `scope` and returns how many of them
/// failed.
///
/// Entries are matched by old or new absolute path depending on `check_new_path`. A companion
/// file missing from the response is left alone so it can be retried on its own.
pub(crate) fn handle_source_control_result(
    container: &mut SourceFileRelocationContainer,
    scope: Range<usize>,
    check_flag: SourceControlFlag,
    check_new_path: bool,
    response: &ScResponse,
) -> usize {
    let mut error_count = 0;

    for entry in &mut container[scope] {
        let check_path = if check_new_path {
            &entry.new_absolute_path
        } else {
            &entry.old_absolute_path
        };
        let check_path = normalize_file_path(check_path);

        let found = response
            .files
            .iter()
            .find(|file| normalize_file_path(&file.path) == check_path);

        let read_only = match found {
            Some(file) => {
                entry.operation_status = if file.status == SourceControlStatus::OpSuccess
                    && file.has_flag(check_flag)
                {
                    RelocationStatus::Succeeded
                } else {
                    RelocationStatus::Failed
                };
                !file.has_flag(SourceControlFlag::Writable)
            }
            None if entry.source_file_index.is_some() => continue,
            None => {
                entry.operation_status = RelocationStatus::Failed;
                false
            }
        };

        if entry.operation_status == RelocationStatus::Failed {
            error_count += 1;
            if found.is_none() {
                error!(
                    "Error: file is not tracked by source control {}",
                    entry.old_absolute_path
                );
            } else {
                error!(
                    "Error: operation failed for file {}.  Note: File is {}.",
                    entry.old_absolute_path,
                    if read_only {
                        "read-only"
                    } else {
                        "writable (this is not the source of the error)"
                    }
                );
            }
        }
    }

    error_count
}

/// Removes the folders left empty by the operation, walking up from each old location until a
/// folder is not empty or the scan-folder root is reached.
pub(crate) fn remove_empty_folders(io: &dyn FileIo, container: &SourceFileRelocationContainer) {
    for info in container {
        let mut current = parent(&info.old_absolute_path).map(str::to_string);
        while let Some(folder) = current {
            if eq_ignore_case(&folder, &info.scan_folder_path)
                || !starts_with_ignore_case(&folder, &info.scan_folder_path)
            {
                break;
            }
            // Non-empty folders fail to delete, which ends the walk.
            if io.remove_empty_dir(&folder).is_err() {
                break;
            }
            current = parent(&folder).map(str::to_string);
        }
    }
}

impl SourceFileRelocator {
    /// Renames every entry through source control and returns the number of failures.
    pub(crate) fn do_move(
        &self,
        normalized_source: &str,
        normalized_destination: &str,
        container: &mut SourceFileRelocationContainer,
        source_scan_folder: &ScanFolderInfo,
        destination_scan_folder: &ScanFolderInfo,
        remove_empty: bool,
    ) -> usize {
        let mut conflicts = 0;
        for info in container.iter() {
            let old_path = &info.old_absolute_path;
            let new_path = &info.new_absolute_path;

            if old_path == new_path {
                // Renaming to the same name happens with wildcard renames and is not an error.
                continue;
            }

            if eq_ignore_case(old_path, new_path) {
                error!(
                    "Error: Changing the case of a filename is not supported due to potential source control restrictions.  OldPath: {}, NewPath: {}",
                    old_path, new_path
                );
                return 1;
            }

            if self.config.file_io().exists(new_path) {
                error!("Error: Destination file {} already exists", new_path);
                conflicts += 1;
            }
        }

        // Nothing is renamed when any destination is taken, so companion files stay paired.
        if conflicts > 0 {
            for info in container.iter_mut() {
                info.operation_status = RelocationStatus::Failed;
            }
            warn!(
                "Move cancelled: {} destination file(s) already exist",
                conflicts
            );
            return container.len();
        }

        let destination = fix_destination_missing_filename(normalized_destination, normalized_source);
        let absolute_source = to_forward_slashes(&to_absolute_path(normalized_source, source_scan_folder));
        let absolute_destination =
            to_forward_slashes(&to_absolute_path(&destination, destination_scan_folder));

        info!("From: {}, To: {}", absolute_source, absolute_destination);

        let pending = self
            .source_control
            .rename_bulk(&absolute_source, &absolute_destination);
        let response = match wait_for_response(&pending, self.timeout) {
            Ok(response) => response,
            Err(_) => return 1,
        };

        let all = 0..container.len();
        let mut error_count = handle_source_control_result(
            container,
            all,
            // Moving A -> B -> A is reported as a plain edit, so being checked out is enough.
            SourceControlFlag::OpenByUser,
            true,
            &response,
        );

        // A bulk rename by the source pattern does not necessarily carry companion files along.
        for index in 0..container.len() {
            let entry = &container[index];
            if entry.operation_status == RelocationStatus::Succeeded
                || entry.source_file_index.is_none()
            {
                continue;
            }

            let pending = self
                .source_control
                .rename_bulk(&entry.old_absolute_path, &entry.new_absolute_path);
            let response = match wait_for_response(&pending, self.timeout) {
                Ok(response) => response,
                Err(_) => return error_count + 1,
            };
            error_count += handle_source_control_result(
                container,
                index..index + 1,
                SourceControlFlag::OpenByUser,
                true,
                &response,
            );
        }

        if remove_empty {
            remove_empty_folders(self.config.file_io().as_ref(), container);
        }

        error_count
    }

    /// Deletes every entry through source control and returns the number of failures.
    pub(crate) fn do_delete(
        &self,
        normalized_source: &str,
        container: &mut SourceFileRelocationContainer,
        scan_folder: &ScanFolderInfo,
        remove_empty: bool,
    ) -> usize {
        let absolute_source = to_forward_slashes(&to_absolute_path(normalized_source, scan_folder));
        info!("Delete {}", absolute_source);

        let source_control_enabled = self.source_control.is_active();
        // Without a provider the only flag reported for a deleted file is the writable flag.
        let check_flag = if source_control_enabled {
            SourceControlFlag::PendingDelete
        } else {
            SourceControlFlag::Writable
        };

        let pending = self.source_control.delete_bulk(&absolute_source);
        let response = match wait_for_response(&pending, self.timeout) {
            Ok(response) => response,
            Err(_) => return 1,
        };
        let all = 0..container.len();
        let mut error_count =
            handle_source_control_result(container, all, check_flag, false, &response);

        for index in 0..container.len() {
            let entry = &container[index];
            if entry.operation_status == RelocationStatus::Succeeded
                || entry.source_file_index.is_none()
            {
                continue;
            }

            let pending = self.source_control.delete_bulk(&entry.old_absolute_path);
            let response = match wait_for_response(&pending, self.timeout) {
                Ok(response) => response,
                Err(_) => return error_count + 1,
            };
            error_count += handle_source_control_result(
                container,
                index..index + 1,
                check_flag,
                false,
                &response,
            );
        }

        if !source_control_enabled {
            // The local flags say little, so confirm the files are actually gone.
            for entry in container.iter_mut() {
                if entry.operation_status == RelocationStatus::Succeeded
                    && self.config.file_io().exists(&entry.old_absolute_path)
                {
                    error!("Error: {} still exists after delete", entry.old_absolute_path);
                    entry.operation_status = RelocationStatus::Failed;
                    error_count += 1;
                }
            }
        }

        if remove_empty {
            remove_empty_folders(self.config.file_io().as_ref(), container);
        }

        error_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocator::types::SourceFileRelocationInfo;
    use crate::source_control::{SourceControlFileInfo, SourceControlFlags};
    use crate::storage::models::SourceDatabaseEntry;
    use std::collections::BTreeMap;

    fn entry(name: &str) -> SourceFileRelocationInfo {
        let folder = ScanFolderInfo::new("/root", "root", "root");
        let mut info = SourceFileRelocationInfo::from_source(
            SourceDatabaseEntry::placeholder(1, name),
            BTreeMap::new(),
            &folder,
            false,
        );
        info.new_absolute_path = format!("/root/moved/{}", name);
        info
    }

    fn moved(path: &str, open_by_user: bool) -> SourceControlFileInfo {
        SourceControlFileInfo {
            path: path.to_string(),
            status: SourceControlStatus::OpSuccess,
            flags: SourceControlFlags {
                writable: true,
                pending_delete: false,
                open_by_user,
            },
        }
    }

    #[test]
    fn test_result_marks_found_and_missing_entries() {
        let mut container = vec![entry("a.txt"), entry("b.txt"), entry("c.txt")];
        container[2].source_file_index = Some(0);
        container[2].metadata_index = Some(0);

        let response = ScResponse {
            success: true,
            files: vec![moved("/root/moved/a.txt", true)],
        };
        let errors = handle_source_control_result(
            &mut container,
            0..3,
            SourceControlFlag::OpenByUser,
            true,
            &response,
        );

        assert_eq!(errors, 1);
        assert_eq!(container[0].operation_status, RelocationStatus::Succeeded);
        assert_eq!(container[1].operation_status, RelocationStatus::Failed);
        // Companion files are retried separately.
        assert_eq!(container[2].operation_status, RelocationStatus::None);
    }

    #[test]
    fn test_result_requires_check_flag() {
        let mut container = vec![entry("a.txt")];
        let response = ScResponse {
            success: true,
            files: vec![moved("/root/moved/a.txt", false)],
        };
        let errors = handle_source_control_result(
            &mut container,
            0..1,
            SourceControlFlag::OpenByUser,
            true,
            &response,
        );
        assert_eq!(errors, 1);
        assert_eq!(container[0].operation_status, RelocationStatus::Failed);
    }
}
