use super::{
    pending, Pending, ScResponse, SourceControl, SourceControlFileInfo, SourceControlFlags,
    SourceControlState, SourceControlStatus,
};
use crate::file_io::FileIo;
use crate::path_utils::{normalize_file_path, to_forward_slashes, SEPARATOR};
use crate::relocator::handle_wildcard;
use crate::scan_folder::wildcard::find_wildcard_matches;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

/// Provider used when no source control system is configured. Every request is answered from
/// the local filesystem on a worker thread.
#[derive(Clone)]
pub struct LocalSourceControl {
    io: Arc<dyn FileIo>,
}

impl LocalSourceControl {
    pub fn new(io: Arc<dyn FileIo>) -> Self {
        Self { io }
    }

    fn spawn<F>(&self, work: F) -> Pending
    where
        F: FnOnce(&dyn FileIo) -> ScResponse + Send + 'static,
    {
        let (tx, rx) = pending();
        let io = Arc::clone(&self.io);
        thread::spawn(move || {
            let response = work(io.as_ref());
            // The requester may have given up waiting.
            let _ = tx.send(response);
        });
        rx
    }
}

fn is_wildcard(path: &str) -> bool {
    path.contains(['*', '?'])
}

/// Every existing file named by `path`, which may contain wildcards.
fn expand(io: &dyn FileIo, path: &str) -> Vec<String> {
    let path = to_forward_slashes(path);
    if !is_wildcard(&path) {
        return if io.exists(&path) && !io.is_directory(&path) {
            vec![normalize_file_path(&path)]
        } else {
            Vec::new()
        };
    }

    let first_wildcard = path.find(['*', '?']).unwrap_or(0);
    let Some(split) = path[..first_wildcard].rfind(SEPARATOR) else {
        return Vec::new();
    };
    let base = if split == 0 { "/" } else { &path[..split] };
    let pattern = &path[split + 1..];

    find_wildcard_matches(base, pattern, false, true)
        .into_iter()
        .map(|file| normalize_file_path(&file))
        .collect()
}

fn file_info(path: String, succeeded: bool, flags: SourceControlFlags) -> SourceControlFileInfo {
    SourceControlFileInfo {
        path,
        status: if succeeded {
            SourceControlStatus::OpSuccess
        } else {
            SourceControlStatus::OpFailed
        },
        flags,
    }
}

fn writable_flags(io: &dyn FileIo, path: &str) -> SourceControlFlags {
    SourceControlFlags {
        writable: io.metadata(path).is_ok(),
        ..Default::default()
    }
}

impl SourceControl for LocalSourceControl {
    fn state(&self) -> SourceControlState {
        SourceControlState::Disabled
    }

    fn get_bulk_file_info(&self, paths: &[String]) -> Pending {
        let paths = paths.to_vec();
        self.spawn(move |io| {
            let files = paths
                .iter()
                .flat_map(|path| expand(io, path))
                .map(|file| {
                    let flags = writable_flags(io, &file);
                    file_info(file, true, flags)
                })
                .collect();
            ScResponse {
                success: true,
                files,
            }
        })
    }

    fn rename_bulk(&self, from: &str, to: &str) -> Pending {
        let from = normalize_file_path(from);
        let to = normalize_file_path(to);
        self.spawn(move |io| {
            let mut response = ScResponse {
                success: true,
                files: Vec::new(),
            };

            for old_path in expand(io, &from) {
                let new_path = if is_wildcard(&from) {
                    match handle_wildcard(&old_path, &from, &to) {
                        Ok(path) => normalize_file_path(&path),
                        Err(reason) => {
                            error!("Cannot rename {}: {}", old_path, reason.trim_end());
                            response.success = false;
                            continue;
                        }
                    }
                } else {
                    to.clone()
                };

                let succeeded = match io.rename(&old_path, &new_path) {
                    Ok(()) => {
                        debug!("Renamed {} -> {}", old_path, new_path);
                        true
                    }
                    Err(e) => {
                        error!("Failed to rename {} -> {}: {}", old_path, new_path, e);
                        response.success = false;
                        false
                    }
                };

                let flags = SourceControlFlags {
                    writable: succeeded,
                    pending_delete: false,
                    open_by_user: succeeded,
                };
                response.files.push(file_info(new_path, succeeded, flags));
            }

            response
        })
    }

    fn delete_bulk(&self, pattern: &str) -> Pending {
        let pattern = normalize_file_path(pattern);
        self.spawn(move |io| {
            let mut response = ScResponse {
                success: true,
                files: Vec::new(),
            };

            for path in expand(io, &pattern) {
                let succeeded = match io.remove_file(&path) {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Failed to delete {}: {}", path, e);
                        response.success = false;
                        false
                    }
                };
                let flags = SourceControlFlags {
                    writable: succeeded,
                    ..Default::default()
                };
                response.files.push(file_info(path, succeeded, flags));
            }

            response
        })
    }

    fn edit_bulk(&self, paths: &[String]) -> Pending {
        let paths = paths.to_vec();
        self.spawn(move |io| {
            let files = paths
                .into_iter()
                .map(|path| {
                    let flags = writable_flags(io, &path);
                    file_info(normalize_file_path(&path), true, flags)
                })
                .collect();
            ScResponse {
                success: true,
                files,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_io::LocalFileIo;
    use crate::source_control::{wait_for_response, SourceControlFlag, DEFAULT_TIMEOUT};
    use std::fs;
    use tempfile::tempdir;

    fn provider() -> LocalSourceControl {
        LocalSourceControl::new(Arc::new(LocalFileIo))
    }

    fn root_of(dir: &tempfile::TempDir) -> String {
        to_forward_slashes(&dir.path().to_string_lossy())
    }

    #[test]
    fn test_file_info_expands_wildcards() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/a.txt"), "a").unwrap();
        fs::write(tmp.path().join("sub/b.txt"), "b").unwrap();
        fs::write(tmp.path().join("sub/c.dat"), "c").unwrap();
        let root = root_of(&tmp);

        let pending = provider().get_bulk_file_info(&[format!("{}/sub/*.txt", root)]);
        let response = wait_for_response(&pending, DEFAULT_TIMEOUT).unwrap();
        assert!(response.success);
        assert_eq!(response.files.len(), 2);
        assert!(response
            .files
            .iter()
            .all(|file| file.has_flag(SourceControlFlag::Writable)));
    }

    #[test]
    fn test_rename_bulk_substitutes_wildcards() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("from")).unwrap();
        fs::write(tmp.path().join("from/one.txt"), "1").unwrap();
        let root = root_of(&tmp);

        let pending = provider().rename_bulk(
            &format!("{}/from/*.txt", root),
            &format!("{}/to/*.txt", root),
        );
        let response = wait_for_response(&pending, DEFAULT_TIMEOUT).unwrap();
        assert!(response.success);
        assert_eq!(response.files.len(), 1);
        assert!(response.files[0].path.ends_with("/to/one.txt"));
        assert!(response.files[0].has_flag(SourceControlFlag::OpenByUser));
        assert!(tmp.path().join("to/one.txt").exists());
        assert!(!tmp.path().join("from/one.txt").exists());
    }

    #[test]
    fn test_delete_bulk_reports_old_paths() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("gone.txt"), "x").unwrap();
        let root = root_of(&tmp);

        let pending = provider().delete_bulk(&format!("{}/gone.txt", root));
        let response = wait_for_response(&pending, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(response.files.len(), 1);
        assert!(response.files[0].path.ends_with("gone.txt"));
        assert_eq!(response.files[0].status, SourceControlStatus::OpSuccess);
        assert!(!tmp.path().join("gone.txt").exists());
    }
}
