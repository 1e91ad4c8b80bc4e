pub mod config;
pub mod error;
pub mod file_io;
pub mod file_state;
pub mod path_utils;
pub mod progress;
pub mod relocator;
pub mod scan_folder;
pub mod scanner;
pub mod source_control;
pub mod storage;

// Re-export key types for convenience
pub use config::AppConfig;
pub use error::{Error, Result};
pub use file_io::{FileIo, LocalFileIo};
pub use file_state::{FileState, FileStateCache, FileStateInfo, FileStatePassthrough};
pub use progress::{ProgressReporter, SilentReporter};
pub use relocator::{MoveFailure, RelocationFlags, RelocationSuccess, SourceFileRelocator};
pub use scan_folder::{PlatformConfig, ScanFolderInfo};
pub use source_control::{LocalSourceControl, SourceControl};
pub use storage::{AssetDatabase, SqliteAssetDatabase};
