use super::case::{correct_absolute_case, host_is_case_sensitive};
use super::hash::hash_file;
use super::{DeleteHandler, FileState, FileStateInfo};
use crate::file_io::FileIo;
use crate::path_utils::to_forward_slashes;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// [`FileState`] without any retained state: every query goes to the filesystem.
///
/// Answers are still case-insensitive. On a case-sensitive filesystem, or when a direct lookup
/// misses, the real directory listings are consulted to find the on-disk case.
pub struct FileStatePassthrough {
    io: Arc<dyn FileIo>,
    case_sensitive_fs: bool,
    delete_handlers: RwLock<Vec<DeleteHandler>>,
}

impl FileStatePassthrough {
    pub fn new(io: Arc<dyn FileIo>) -> Self {
        Self::with_case_sensitivity(io, host_is_case_sensitive())
    }

    pub fn with_case_sensitivity(io: Arc<dyn FileIo>, case_sensitive_fs: bool) -> Self {
        Self {
            io,
            case_sensitive_fs,
            delete_handlers: RwLock::new(Vec::new()),
        }
    }
}

impl FileState for FileStatePassthrough {
    fn get_file_info(&self, absolute_path: &str) -> Option<FileStateInfo> {
        let absolute_path = to_forward_slashes(absolute_path);

        if !self.case_sensitive_fs {
            if let Ok(metadata) = self.io.metadata(&absolute_path) {
                return Some(FileStateInfo::from_metadata(absolute_path, &metadata));
            }
        }

        let corrected = correct_absolute_case(self.io.as_ref(), &absolute_path)?;
        let metadata = self.io.metadata(&corrected).ok()?;
        Some(FileStateInfo::from_metadata(corrected, &metadata))
    }

    fn get_hash(&self, absolute_path: &str) -> Option<u64> {
        let info = self.get_file_info(absolute_path)?;
        match hash_file(self.io.as_ref(), &info.absolute_path) {
            Ok(hash) => Some(hash),
            Err(err) => {
                warn!("Failed to hash {}: {}", info.absolute_path, err);
                None
            }
        }
    }

    fn warm_up_cache(&self, _info: FileStateInfo, _hash: Option<u64>) {}

    fn add_info_set(&self, _infos: Vec<FileStateInfo>) {}

    fn add_file(&self, _absolute_path: &str) {}

    fn update_file(&self, _absolute_path: &str) {}

    fn remove_file(&self, absolute_path: &str) {
        let Some(info) = self.get_file_info(absolute_path) else {
            return;
        };
        for handler in self
            .delete_handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
        {
            handler(&info);
        }
    }

    fn register_for_delete_event(&self, handler: DeleteHandler) {
        self.delete_handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handler);
    }
}
