pub mod cache;
pub mod case;
pub mod hash;
pub mod passthrough;
pub mod path_key;

use crate::file_io::FileMetadata;
use chrono::{DateTime, Utc};

pub use cache::FileStateCache;
pub use passthrough::FileStatePassthrough;
pub use path_key::PathKeys;

/// Last known on-disk state of a single file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStateInfo {
    pub absolute_path: String,
    pub mod_time: DateTime<Utc>,
    pub size: u64,
    pub is_directory: bool,
}

impl FileStateInfo {
    pub fn new(
        absolute_path: impl Into<String>,
        mod_time: DateTime<Utc>,
        size: u64,
        is_directory: bool,
    ) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            mod_time,
            size,
            is_directory,
        }
    }

    pub fn from_metadata(absolute_path: impl Into<String>, metadata: &FileMetadata) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            mod_time: DateTime::<Utc>::from(metadata.modified),
            size: metadata.size,
            is_directory: metadata.is_directory,
        }
    }
}

/// Called with the last known info of a removed entry, before it is erased.
pub type DeleteHandler = Box<dyn Fn(&FileStateInfo) + Send + Sync>;

/// Existence and metadata queries for files under the scan folders.
///
/// Lookups are case-insensitive regardless of the host filesystem. Implementations must be safe
/// to share between a watcher thread doing writes and any number of reader threads.
pub trait FileState: Send + Sync {
    fn get_file_info(&self, absolute_path: &str) -> Option<FileStateInfo>;

    fn exists(&self, absolute_path: &str) -> bool {
        self.get_file_info(absolute_path).is_some()
    }

    /// Content hash of a known file. `None` when the path is unknown or cannot be read.
    fn get_hash(&self, absolute_path: &str) -> Option<u64>;

    /// Insert or overwrite an entry. A `None` hash drops any hash cached for it.
    fn warm_up_cache(&self, info: FileStateInfo, hash: Option<u64>);

    fn add_info_set(&self, infos: Vec<FileStateInfo>);

    fn add_file(&self, absolute_path: &str);

    fn update_file(&self, absolute_path: &str);

    fn remove_file(&self, absolute_path: &str);

    fn register_for_delete_event(&self, handler: DeleteHandler);
}
