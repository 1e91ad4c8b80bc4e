pub mod config;
pub mod wildcard;

use crate::path_utils::{normalize_directory_path, to_forward_slashes};

pub use config::PlatformConfig;

/// A configured root directory watched for source assets.
///
/// Everything except the database id is fixed at construction; builders are consuming so a
/// folder is always fully described before it is handed to a [`PlatformConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFolderInfo {
    scan_path: String,
    display_name: String,
    portable_key: String,
    output_prefix: String,
    is_root: bool,
    recurse: bool,
    platforms: Vec<String>,
    order: i32,
    scan_folder_id: i64,
    can_save_new_assets: bool,
}

impl ScanFolderInfo {
    pub fn new(scan_path: &str, display_name: &str, portable_key: &str) -> Self {
        Self {
            scan_path: normalize_directory_path(scan_path),
            display_name: display_name.to_string(),
            portable_key: portable_key.to_string(),
            output_prefix: String::new(),
            is_root: false,
            recurse: true,
            platforms: Vec::new(),
            order: 0,
            scan_folder_id: 0,
            can_save_new_assets: true,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn with_output_prefix(mut self, output_prefix: &str) -> Self {
        self.output_prefix = to_forward_slashes(output_prefix).trim_matches('/').to_string();
        self
    }

    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn with_can_save_new_assets(mut self, can_save_new_assets: bool) -> Self {
        self.can_save_new_assets = can_save_new_assets;
        self
    }

    pub fn with_scan_folder_id(mut self, scan_folder_id: i64) -> Self {
        self.scan_folder_id = scan_folder_id;
        self
    }

    pub fn set_scan_folder_id(&mut self, scan_folder_id: i64) {
        self.scan_folder_id = scan_folder_id;
    }

    pub fn scan_path(&self) -> &str {
        &self.scan_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn portable_key(&self) -> &str {
        &self.portable_key
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn recurse(&self) -> bool {
        self.recurse
    }

    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn scan_folder_id(&self) -> i64 {
        self.scan_folder_id
    }

    pub fn can_save_new_assets(&self) -> bool {
        self.can_save_new_assets
    }
}

/// Companion-file naming rule: a file with `metadata_extension` belongs to the source file with
/// `source_extension`, or to any source when `source_extension` is empty (the metadata extension
/// is then appended to the full source file name instead of replacing its extension).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataFileType {
    pub metadata_extension: String,
    pub source_extension: String,
}

impl MetadataFileType {
    pub fn new(metadata_extension: &str, source_extension: &str) -> Self {
        Self {
            metadata_extension: metadata_extension.trim_start_matches('.').to_lowercase(),
            source_extension: source_extension.trim_start_matches('.').to_lowercase(),
        }
    }

    pub fn replaces_extension(&self) -> bool {
        !self.source_extension.is_empty()
    }
}
