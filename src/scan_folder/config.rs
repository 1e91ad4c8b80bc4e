use super::wildcard::{find_wildcard_matches, find_wildcard_matches_excluding};
use super::{MetadataFileType, ScanFolderInfo};
use crate::config::AppConfig;
use crate::file_io::FileIo;
use crate::file_state::case::update_to_correct_case;
use crate::file_state::FileState;
use crate::path_utils::{
    eq_ignore_case, extension, join, normalize_directory_path, normalize_file_path,
    starts_with_ignore_case, SEPARATOR,
};
use std::sync::Arc;
use tracing::debug;

/// Scan folders and companion-file rules for one project, plus the file state used to answer
/// "does this file exist" questions against them.
///
/// Scan folders are kept sorted by ascending order value. Every lookup walks them in that order
/// and the first folder that satisfies the predicate wins.
pub struct PlatformConfig {
    scan_folders: Vec<ScanFolderInfo>,
    metadata_types: Vec<MetadataFileType>,
    uuid_enabled_extensions: Vec<String>,
    file_state: Arc<dyn FileState>,
    io: Arc<dyn FileIo>,
}

impl PlatformConfig {
    pub fn new(file_state: Arc<dyn FileState>, io: Arc<dyn FileIo>) -> Self {
        Self {
            scan_folders: Vec::new(),
            metadata_types: Vec::new(),
            uuid_enabled_extensions: Vec::new(),
            file_state,
            io,
        }
    }

    pub fn from_settings(
        settings: &AppConfig,
        file_state: Arc<dyn FileState>,
        io: Arc<dyn FileIo>,
    ) -> Self {
        let mut config = Self::new(file_state, io);

        for folder in &settings.scan_folders {
            config.add_scan_folder(
                ScanFolderInfo::new(&folder.path, &folder.display_name, &folder.portable_key)
                    .with_output_prefix(&folder.output_prefix)
                    .with_recurse(folder.recurse)
                    .with_order(folder.order)
                    .with_root(folder.is_root)
                    .with_can_save_new_assets(folder.can_save_new_assets)
                    .with_platforms(folder.platforms.clone()),
            );
        }

        for metadata in &settings.metadata_types {
            config.add_metadata_type(&metadata.metadata_extension, &metadata.source_extension);
        }

        for ext in &settings.uuid_enabled_extensions {
            config.add_uuid_enabled_extension(ext);
        }

        debug!(
            "Loaded {} scan folders and {} metadata types",
            config.scan_folders.len(),
            config.metadata_types.len()
        );
        config
    }

    pub fn file_state(&self) -> &Arc<dyn FileState> {
        &self.file_state
    }

    pub fn file_io(&self) -> &Arc<dyn FileIo> {
        &self.io
    }

    /// Adds a folder, replacing any earlier folder with the same portable key.
    pub fn add_scan_folder(&mut self, info: ScanFolderInfo) {
        if !info.portable_key().is_empty() {
            let key = info.portable_key().to_lowercase();
            self.scan_folders
                .retain(|existing| existing.portable_key().to_lowercase() != key);
        }
        self.scan_folders.push(info);
        // Vec::sort_by_key is stable: equal orders keep insertion order.
        self.scan_folders.sort_by_key(|folder| folder.order());
    }

    pub fn scan_folder_count(&self) -> usize {
        self.scan_folders.len()
    }

    pub fn scan_folder_at(&self, index: usize) -> Option<&ScanFolderInfo> {
        self.scan_folders.get(index)
    }

    pub fn scan_folders(&self) -> &[ScanFolderInfo] {
        &self.scan_folders
    }

    pub fn scan_folders_mut(&mut self) -> &mut [ScanFolderInfo] {
        &mut self.scan_folders
    }

    pub fn scan_folder_by_id(&self, scan_folder_id: i64) -> Option<&ScanFolderInfo> {
        self.scan_folders
            .iter()
            .find(|folder| folder.scan_folder_id() == scan_folder_id)
    }

    pub fn scan_folder_by_path(&self, scan_path: &str) -> Option<&ScanFolderInfo> {
        let scan_path = normalize_directory_path(scan_path);
        self.scan_folders
            .iter()
            .find(|folder| folder.scan_path() == scan_path)
    }

    /// Scan folder that owns `absolute_path`.
    ///
    /// A path that is exactly a scan-folder root always resolves to that folder. Otherwise the
    /// first folder whose root is a directory prefix of the path wins, except that a
    /// non-recursive folder only owns its direct children.
    pub fn scan_folder_for_file(&self, absolute_path: &str) -> Option<&ScanFolderInfo> {
        let normalized = normalize_file_path(absolute_path);

        if let Some(exact) = self
            .scan_folders
            .iter()
            .find(|folder| eq_ignore_case(&normalized, folder.scan_path()))
        {
            return Some(exact);
        }

        self.scan_folders.iter().find(|folder| {
            let root = folder.scan_path();
            if normalized.len() <= root.len() || !starts_with_ignore_case(&normalized, root) {
                return false;
            }
            let rest = &normalized[root.len()..];
            let relative = if root.ends_with(SEPARATOR) {
                rest
            } else {
                match rest.strip_prefix(SEPARATOR) {
                    Some(relative) => relative,
                    // Only a coincidental name prefix, e.g. /root/assets2 vs /root/assets.
                    None => return false,
                }
            };
            folder.recurse() || !relative.contains(SEPARATOR)
        })
    }

    /// Strips `info`'s root and the separator after it. With `include_output_prefix`, a
    /// non-empty output prefix is put in front of the result.
    pub fn convert_to_relative_path(
        absolute_path: &str,
        info: &ScanFolderInfo,
        include_output_prefix: bool,
    ) -> String {
        let normalized = normalize_file_path(absolute_path);
        let root = info.scan_path();

        let relative = if normalized.len() > root.len() {
            let rest = normalized.get(root.len()..).unwrap_or_default();
            rest.trim_start_matches(SEPARATOR).to_string()
        } else {
            String::new()
        };

        if include_output_prefix && !info.output_prefix().is_empty() {
            join(info.output_prefix(), &relative)
        } else {
            relative
        }
    }

    /// Finds the owning scan folder and returns `(relative_path, scan_folder_path)`.
    pub fn convert_to_relative_path_any(&self, absolute_path: &str) -> Option<(String, String)> {
        let info = self.scan_folder_for_file(absolute_path)?;
        Some((
            Self::convert_to_relative_path(absolute_path, info, false),
            info.scan_path().to_string(),
        ))
    }

    /// Absolute path of a file in a higher-priority scan folder that shadows `relative_name` in
    /// the folder rooted at `scan_folder_name`, or `None` when nothing overrides it.
    pub fn get_overriding_file(&self, relative_name: &str, scan_folder_name: &str) -> Option<String> {
        let scan_folder_name = normalize_directory_path(scan_folder_name);
        let relative_name = normalize_file_path(relative_name);

        for folder in &self.scan_folders {
            if eq_ignore_case(&scan_folder_name, folder.scan_path()) {
                // Every remaining folder has lower priority than the one holding the file.
                return None;
            }

            let mut candidate = relative_name.as_str();
            let prefix = folder.output_prefix();
            if !prefix.is_empty()
                && candidate.len() > prefix.len()
                && starts_with_ignore_case(candidate, prefix)
                && candidate[prefix.len()..].starts_with(SEPARATOR)
            {
                candidate = &candidate[prefix.len() + 1..];
            }

            if !folder.recurse() && candidate.contains(SEPARATOR) {
                continue;
            }

            if let Some(corrected) =
                update_to_correct_case(self.io.as_ref(), folder.scan_path(), candidate)
            {
                return Some(join(folder.scan_path(), &corrected));
            }
        }

        None
    }

    /// Absolute path of the first scan folder in which `relative_name` is a known file.
    pub fn find_first_matching_file(&self, relative_name: &str) -> Option<String> {
        if relative_name.is_empty() {
            return None;
        }
        let relative_name = normalize_file_path(relative_name);

        for folder in &self.scan_folders {
            if !folder.recurse() && relative_name.contains(SEPARATOR) {
                continue;
            }
            let absolute = join(folder.scan_path(), &relative_name);
            if let Some(info) = self.file_state.get_file_info(&absolute) {
                return Some(normalize_file_path(&info.absolute_path));
            }
        }

        None
    }

    pub fn find_wildcard_matches(
        &self,
        source_folder: &str,
        relative_pattern: &str,
        include_folders: bool,
        recursive: bool,
    ) -> Vec<String> {
        find_wildcard_matches(source_folder, relative_pattern, include_folders, recursive)
    }

    pub fn find_wildcard_matches_excluding(
        &self,
        source_folder: &str,
        relative_pattern: &str,
        excluded_folders: &[String],
        include_folders: bool,
        recursive: bool,
    ) -> Vec<String> {
        find_wildcard_matches_excluding(
            source_folder,
            relative_pattern,
            excluded_folders,
            include_folders,
            recursive,
        )
    }

    /// Registers a companion-file rule. Extensions are compared lower-cased; repeats are ignored.
    pub fn add_metadata_type(&mut self, metadata_extension: &str, source_extension: &str) {
        let metadata = MetadataFileType::new(metadata_extension, source_extension);
        if !self.metadata_types.contains(&metadata) {
            self.metadata_types.push(metadata);
        }
    }

    pub fn metadata_type_count(&self) -> usize {
        self.metadata_types.len()
    }

    pub fn metadata_type_at(&self, index: usize) -> Option<&MetadataFileType> {
        self.metadata_types.get(index)
    }

    pub fn metadata_types(&self) -> &[MetadataFileType] {
        &self.metadata_types
    }

    pub fn add_uuid_enabled_extension(&mut self, ext: &str) {
        let ext = ext.trim_start_matches('.').to_lowercase();
        if !self.uuid_enabled_extensions.contains(&ext) {
            self.uuid_enabled_extensions.push(ext);
        }
    }

    /// Whether sources of this type carry their identity in a side-car file rather than being
    /// referenced through the dependency tables.
    pub fn is_uuid_generation_enabled(&self, file: &str) -> bool {
        match extension(file) {
            Some(ext) => {
                let ext = ext.to_lowercase();
                self.uuid_enabled_extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_io::LocalFileIo;
    use crate::file_state::FileStateCache;

    fn config() -> PlatformConfig {
        let io: Arc<dyn FileIo> = Arc::new(LocalFileIo);
        PlatformConfig::new(Arc::new(FileStateCache::new(io.clone())), io)
    }

    #[test]
    fn test_folders_sorted_by_order_and_stable() {
        let mut config = config();
        config.add_scan_folder(ScanFolderInfo::new("/c", "c", "c").with_order(5));
        config.add_scan_folder(ScanFolderInfo::new("/a", "a", "a").with_order(0));
        config.add_scan_folder(ScanFolderInfo::new("/b", "b", "b").with_order(0));

        let paths: Vec<&str> = config.scan_folders().iter().map(|f| f.scan_path()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn test_duplicate_portable_key_last_wins() {
        let mut config = config();
        config.add_scan_folder(ScanFolderInfo::new("/old", "x", "Key").with_order(1));
        config.add_scan_folder(ScanFolderInfo::new("/new", "x", "key").with_order(2));

        assert_eq!(config.scan_folder_count(), 1);
        assert_eq!(config.scan_folder_at(0).map(|f| f.scan_path()), Some("/new"));
    }

    #[test]
    fn test_scan_folder_for_file_rejects_name_prefix_and_deep_non_recursive() {
        let mut config = config();
        config.add_scan_folder(ScanFolderInfo::new("/root/assets", "assets", "assets"));
        config.add_scan_folder(
            ScanFolderInfo::new("/root/flat", "flat", "flat")
                .with_recurse(false)
                .with_order(1),
        );

        assert!(config.scan_folder_for_file("/root/assets2/file.txt").is_none());
        assert!(config.scan_folder_for_file("/root/flat/sub/file.txt").is_none());
        assert_eq!(
            config.scan_folder_for_file("/ROOT/FLAT/file.txt").map(|f| f.scan_path()),
            Some("/root/flat")
        );
        assert_eq!(
            config.scan_folder_for_file("/root/assets").map(|f| f.scan_path()),
            Some("/root/assets")
        );
    }

    #[test]
    fn test_convert_to_relative_path_with_prefix() {
        let info = ScanFolderInfo::new("/root/gems/ui", "ui", "ui").with_output_prefix("ui/");
        assert_eq!(
            PlatformConfig::convert_to_relative_path("/root/gems/ui/a/b.txt", &info, false),
            "a/b.txt"
        );
        assert_eq!(
            PlatformConfig::convert_to_relative_path("/root/gems/ui/a/b.txt", &info, true),
            "ui/a/b.txt"
        );
        assert_eq!(
            PlatformConfig::convert_to_relative_path("/root/gems/ui", &info, false),
            ""
        );
    }

    #[test]
    fn test_metadata_types_are_lowercased_and_deduped() {
        let mut config = config();
        config.add_metadata_type("ExportSettings", "FBX");
        config.add_metadata_type("exportsettings", "fbx");
        config.add_metadata_type("meta", "");

        assert_eq!(config.metadata_type_count(), 2);
        let first = config.metadata_type_at(0).unwrap();
        assert_eq!(first.metadata_extension, "exportsettings");
        assert_eq!(first.source_extension, "fbx");
        assert!(!config.metadata_type_at(1).unwrap().replaces_extension());
    }

    #[test]
    fn test_uuid_enabled_extensions() {
        let mut config = config();
        config.add_uuid_enabled_extension(".PNG");
        assert!(config.is_uuid_generation_enabled("textures/wall.png"));
        assert!(!config.is_uuid_generation_enabled("textures/wall.tif"));
        assert!(!config.is_uuid_generation_enabled("textures/noext"));
    }
}
