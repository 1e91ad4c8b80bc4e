use super::hash::hash_file;
use super::path_key::PathKeys;
use super::{DeleteHandler, FileState, FileStateInfo};
use crate::file_io::FileIo;
use crate::path_utils::to_forward_slashes;
use ahash::AHashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

#[derive(Default)]
struct CacheState {
    infos: AHashMap<String, FileStateInfo>,
    hashes: AHashMap<String, u64>,
}

/// In-memory mirror of file existence and metadata for everything under the scan folders.
///
/// A hit is never checked against the disk: the entry's presence is the answer. Only
/// [`FileState::get_hash`] reads file contents, and only when no hash is cached yet. All state
/// sits behind one lock per cache.
pub struct FileStateCache {
    io: Arc<dyn FileIo>,
    keys: PathKeys,
    state: RwLock<CacheState>,
    delete_handlers: RwLock<Vec<DeleteHandler>>,
}

impl FileStateCache {
    pub fn new(io: Arc<dyn FileIo>) -> Self {
        Self {
            io,
            keys: PathKeys::new(),
            state: RwLock::new(CacheState::default()),
            delete_handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.read().infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.infos.clear();
        state.hashes.clear();
        self.keys.clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn invalidate_hash(&self, state: &mut CacheState, key: &str) {
        state.hashes.remove(key);
        self.keys.clear();
    }

    fn query_info(&self, absolute_path: &str) -> Option<FileStateInfo> {
        match self.io.metadata(absolute_path) {
            Ok(metadata) => Some(FileStateInfo::from_metadata(absolute_path, &metadata)),
            Err(err) => {
                debug!("Unable to query {}: {}", absolute_path, err);
                None
            }
        }
    }

    fn add_or_update(&self, absolute_path: &str, recurse: bool) {
        let absolute_path = to_forward_slashes(absolute_path);
        let Some(info) = self.query_info(&absolute_path) else {
            return;
        };
        let is_directory = info.is_directory;

        {
            let mut state = self.write();
            let key = self.keys.to_key(&absolute_path);
            state.infos.insert(key.clone(), info);
            self.invalidate_hash(&mut state, &key);
        }

        if recurse && is_directory {
            self.add_directory_contents(&absolute_path);
        }
    }

    fn add_directory_contents(&self, directory: &str) {
        let mut found = Vec::new();
        for entry in WalkDir::new(directory).min_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Error walking {}: {}", directory, err);
                    continue;
                }
            };
            let path = to_forward_slashes(&entry.path().to_string_lossy());
            if let Some(info) = self.query_info(&path) {
                found.push(info);
            }
        }

        debug!("Adding {} entries found under {}", found.len(), directory);
        let mut state = self.write();
        for info in found {
            let key = self.keys.to_key(&info.absolute_path);
            state.hashes.remove(&key);
            state.infos.insert(key, info);
        }
        self.keys.clear();
    }
}

impl FileState for FileStateCache {
    fn get_file_info(&self, absolute_path: &str) -> Option<FileStateInfo> {
        let key = self.keys.to_key(absolute_path);
        self.read().infos.get(&key).cloned()
    }

    fn get_hash(&self, absolute_path: &str) -> Option<u64> {
        let key = self.keys.to_key(absolute_path);

        let info = {
            let state = self.read();
            let info = state.infos.get(&key)?;
            if let Some(hash) = state.hashes.get(&key) {
                return Some(*hash);
            }
            info.clone()
        };

        let hash = match hash_file(self.io.as_ref(), &info.absolute_path) {
            Ok(hash) => hash,
            Err(err) => {
                warn!("Failed to hash {}: {}", info.absolute_path, err);
                return None;
            }
        };
        trace!("Computed hash for {}", info.absolute_path);

        let mut state = self.write();
        // Only remember the hash if the entry did not change while the file was being read.
        if state.infos.get(&key) == Some(&info) {
            state.hashes.insert(key, hash);
        }
        Some(hash)
    }

    fn warm_up_cache(&self, info: FileStateInfo, hash: Option<u64>) {
        let key = self.keys.to_key(&info.absolute_path);
        let mut state = self.write();
        state.infos.insert(key.clone(), info);
        match hash {
            Some(hash) => {
                state.hashes.insert(key, hash);
            }
            None => self.invalidate_hash(&mut state, &key),
        }
    }

    fn add_info_set(&self, infos: Vec<FileStateInfo>) {
        let mut state = self.write();
        let mut dropped_hashes = false;
        for info in infos {
            let key = self.keys.to_key(&info.absolute_path);
            dropped_hashes |= state.hashes.remove(&key).is_some();
            state.infos.insert(key, info);
        }
        if dropped_hashes {
            self.keys.clear();
        }
    }

    fn add_file(&self, absolute_path: &str) {
        self.add_or_update(absolute_path, true);
    }

    fn update_file(&self, absolute_path: &str) {
        self.add_or_update(absolute_path, false);
    }

    fn remove_file(&self, absolute_path: &str) {
        let key = self.keys.to_key(absolute_path);
        let mut state = self.write();

        let Some(info) = state.infos.get(&key).cloned() else {
            return;
        };

        // Handlers run under the cache lock and must not call back into the cache.
        for handler in self
            .delete_handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
        {
            handler(&info);
        }

        if info.is_directory {
            let prefix = if key.ends_with('/') {
                key.clone()
            } else {
                format!("{}/", key)
            };
            state.infos.retain(|child, _| !child.starts_with(&prefix));
            state.hashes.retain(|child, _| !child.starts_with(&prefix));
        }

        state.infos.remove(&key);
        self.invalidate_hash(&mut state, &key);
    }

    fn register_for_delete_event(&self, handler: DeleteHandler) {
        self.delete_handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_io::LocalFileIo;
    use chrono::{TimeZone, Utc};

    fn cache() -> FileStateCache {
        FileStateCache::new(Arc::new(LocalFileIo))
    }

    #[test]
    fn test_untouched_cache_reports_nothing() {
        let cache = cache();
        assert!(cache.get_file_info("/root/file.txt").is_none());
        assert!(!cache.exists("/root/file.txt"));
        assert!(cache.get_hash("/root/file.txt").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_warm_up_with_hash_is_returned_without_reading() {
        let cache = cache();
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        cache.warm_up_cache(FileStateInfo::new("/nowhere/file.txt", time, 3, false), Some(42));
        assert_eq!(cache.get_hash("/NOWHERE/FILE.TXT"), Some(42));
    }

    #[test]
    fn test_remove_unknown_path_is_noop() {
        let cache = cache();
        cache.remove_file("/root/unknown");
        assert!(cache.is_empty());
    }
}
