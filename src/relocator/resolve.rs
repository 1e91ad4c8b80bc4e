use super::types::{SourceFileRelocationContainer, SourceFileRelocationInfo};
use super::SourceFileRelocator;
use crate::path_utils::{
    ends_with_ignore_case, file_name, is_relative, join, normalize_file_path, parent,
    replace_extension, to_forward_slashes, SEPARATOR,
};
use crate::scan_folder::{PlatformConfig, ScanFolderInfo};
use crate::source_control::wait_for_response;
use crate::storage::models::{ProductDatabaseEntry, SourceDatabaseEntry};
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

impl SourceFileRelocator {
    /// Resolves a non-wildcard source to its scan folder and scan-folder relative path.
    ///
    /// A relative path is looked up in every scan folder that could hold it and must exist in
    /// exactly one. With `allow_nonexistent_path`, an unmatched relative path is assumed to
    /// live in the highest priority folder.
    pub fn get_scan_folder_and_relative_path(
        &self,
        normalized_source: &str,
        allow_nonexistent_path: bool,
    ) -> Result<(ScanFolderInfo, String), String> {
        let relative = is_relative(normalized_source);
        let mut scan_folder: Option<&ScanFolderInfo> = None;

        if relative {
            let mut matched_path: Option<String> = None;
            for folder in self.config.scan_folders() {
                if !folder.recurse() && normalized_source.contains(SEPARATOR) {
                    continue;
                }
                let absolute = join(folder.scan_path(), normalized_source);
                if !self.config.file_state().exists(&absolute) {
                    continue;
                }
                match &matched_path {
                    None => {
                        matched_path = Some(normalize_file_path(&absolute));
                        scan_folder = Some(folder);
                    }
                    Some(first) => {
                        return Err(format!(
                            "Relative path matched multiple files/folders.  Please narrow your query by using an absolute path or, if using wildcards, try making your query path more specific.\nMatch 1: {}\nMatch 2: {}\n",
                            first, absolute
                        ));
                    }
                }
            }

            if allow_nonexistent_path && scan_folder.is_none() {
                scan_folder = self.config.scan_folder_at(0);
            }
        } else {
            scan_folder = self.config.scan_folder_for_file(normalized_source);
        }

        let Some(scan_folder) = scan_folder else {
            return Err(format!(
                "Path {} points to a file outside the current project's scan folders.\n",
                normalized_source
            ));
        };

        let relative_path = if relative {
            normalized_source.to_string()
        } else {
            PlatformConfig::convert_to_relative_path(normalized_source, scan_folder, false)
        };

        Ok((scan_folder.clone(), relative_path))
    }

    /// Fills `sources` with every file the request names and returns the scan folder they
    /// live in. Wildcard requests may not span more than one scan folder.
    pub fn get_sources_by_path(
        &self,
        normalized_source: &str,
        sources: &mut SourceFileRelocationContainer,
        exclude_metadata_files: bool,
        allow_non_database_files: bool,
    ) -> Result<ScanFolderInfo, String> {
        if !self.source_control.is_valid() {
            return Err("The Source Control plugin is active but the configuration is invalid.\n\
                        Either disable it or fix its configuration before relocating files.\n"
                .to_string());
        }

        if normalized_source.contains("**") {
            return Err("Consecutive wildcards are not allowed.  Please remove extra wildcards from your query.\n".to_string());
        }

        let is_wildcard = normalized_source.contains(['*', '?']);

        if is_wildcard {
            let mut file_exists = false;
            let mut scan_folder_out: Option<ScanFolderInfo> = None;

            if is_relative(normalized_source) {
                let contains_slash = normalized_source.contains(SEPARATOR);
                for folder in self.config.scan_folders() {
                    if !folder.recurse() && contains_slash {
                        continue;
                    }
                    let absolute = join(folder.scan_path(), normalized_source);
                    if self.get_files_from_source_control(
                        sources,
                        folder,
                        &absolute,
                        exclude_metadata_files,
                        allow_non_database_files,
                    ) {
                        if let Some(first) = &scan_folder_out {
                            return Err(format!(
                                "Wildcard query {} matched files in multiple scanfolders.  Files can only be moved from one scanfolder at a time.  Please narrow your query.\nMatch 1: {}\nMatch 2: {}\n",
                                normalized_source,
                                first.scan_path(),
                                folder.scan_path()
                            ));
                        }
                        file_exists = true;
                        scan_folder_out = Some(folder.clone());
                    }
                }
            } else {
                if !normalized_source.ends_with('*')
                    && self.config.file_io().is_directory(normalized_source)
                {
                    return Err(ERR_DIRECTORY.to_string());
                }

                let path_only = parent(normalized_source).unwrap_or(normalized_source);
                let Some(folder) = self.config.scan_folder_for_file(path_only) else {
                    return Err(format!(
                        "Path {} points to a folder outside the current project's scan folders.\n",
                        path_only
                    ));
                };
                file_exists = self.get_files_from_source_control(
                    sources,
                    folder,
                    normalized_source,
                    exclude_metadata_files,
                    allow_non_database_files,
                );
                scan_folder_out = Some(folder.clone());
            }

            if sources.is_empty() {
                return Err(if file_exists {
                    "Wildcard search matched one or more files but none are source assets.  This utility only handles source assets.\n".to_string()
                } else {
                    "Wildcard search did not match any files.\n".to_string()
                });
            }

            return scan_folder_out.ok_or_else(|| "Wildcard search did not match any files.\n".to_string());
        }

        let (scan_folder, relative_path) =
            self.get_scan_folder_and_relative_path(normalized_source, false)?;
        let absolute_source = join(scan_folder.scan_path(), &relative_path);

        if self.config.file_io().is_directory(&absolute_source) {
            return Err(ERR_DIRECTORY.to_string());
        }

        let file_exists = self.get_files_from_source_control(
            sources,
            &scan_folder,
            &absolute_source,
            exclude_metadata_files,
            allow_non_database_files,
        );

        if sources.is_empty() {
            return Err(if file_exists {
                "Search matched an existing file but it is not a source asset.  This utility only handles source assets.\n".to_string()
            } else {
                "File not found.\n".to_string()
            });
        }

        Ok(scan_folder)
    }

    /// Asks source control for the files matching `absolute_path` so pending adds are
    /// included, then records the sources and companion files among them. Returns whether
    /// any existing file matched.
    fn get_files_from_source_control(
        &self,
        sources: &mut SourceFileRelocationContainer,
        scan_folder: &ScanFolderInfo,
        absolute_path: &str,
        exclude_metadata_files: bool,
        allow_non_database_files: bool,
    ) -> bool {
        let pending = self
            .source_control
            .get_bulk_file_info(&[to_forward_slashes(absolute_path)]);

        let response = match wait_for_response(&pending, self.timeout) {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to list files for {}: {}", absolute_path, e);
                return false;
            }
        };

        if !response.success {
            return false;
        }

        let mut path_matches: Vec<String> = response
            .files
            .iter()
            .filter(|file| self.config.file_io().exists(&file.path))
            .map(|file| normalize_file_path(&file.path))
            .collect();
        let file_exists = !path_matches.is_empty();

        if exclude_metadata_files {
            path_matches.retain(|file| {
                let is_metadata = self.metadata_index_for(file).is_some();
                if is_metadata {
                    info!(
                        "Metadata file {} will be ignored because metadata files are excluded.",
                        file
                    );
                }
                !is_metadata
            });
        }

        let source_index_map =
            self.get_sources(&path_matches, scan_folder, sources, allow_non_database_files);
        self.handle_metadata_files(
            &path_matches,
            &source_index_map,
            scan_folder,
            sources,
            exclude_metadata_files,
        );

        file_exists
    }

    /// Adds one entry per matched file that has a source row (or every matched file when
    /// `allow_non_database_files`). Returns relative name to container index.
    pub fn get_sources(
        &self,
        path_matches: &[String],
        scan_folder: &ScanFolderInfo,
        sources: &mut SourceFileRelocationContainer,
        allow_non_database_files: bool,
    ) -> AHashMap<String, usize> {
        let mut source_index_map = AHashMap::new();
        let mut not_in_database: Vec<String> = Vec::new();

        for file in path_matches {
            let database_name = PlatformConfig::convert_to_relative_path(file, scan_folder, false);
            let before = sources.len();

            let rows = match self
                .db
                .query_source_by_name_and_scan_folder(&database_name, scan_folder.scan_folder_id())
            {
                Ok(rows) => rows.collect::<Vec<_>>(),
                Err(e) => {
                    error!("Source query failed for {}: {}", database_name, e);
                    Vec::new()
                }
            };

            for entry in rows {
                let is_metadata_type = self.config.is_uuid_generation_enabled(&database_name);
                let products = self.get_product_map_for_source(entry.source_id);
                sources.push(SourceFileRelocationInfo::from_source(
                    entry,
                    products,
                    scan_folder,
                    is_metadata_type,
                ));
                source_index_map.insert(database_name.clone(), sources.len() - 1);
            }

            if sources.len() == before && allow_non_database_files {
                sources.push(SourceFileRelocationInfo::from_source(
                    SourceDatabaseEntry::placeholder(scan_folder.scan_folder_id(), &database_name),
                    BTreeMap::new(),
                    scan_folder,
                    false,
                ));
                source_index_map.insert(database_name.clone(), sources.len() - 1);
            }

            if sources.len() == before {
                not_in_database.push(database_name);
            }
        }

        for file in not_in_database {
            info!("File `{}` was found/matched but is not a source asset.  Skipping.", file);
        }

        source_index_map
    }

    fn get_product_map_for_source(&self, source_id: i64) -> BTreeMap<i32, ProductDatabaseEntry> {
        match self.db.query_products_by_source_id(source_id) {
            Ok(rows) => rows.map(|product| (product.sub_id, product)).collect(),
            Err(e) => {
                error!("Product query failed for source {}: {}", source_id, e);
                BTreeMap::new()
            }
        }
    }

    /// Adds companion files: matched files that are themselves metadata files, and the
    /// metadata files that sit next to matched sources.
    pub fn handle_metadata_files(
        &self,
        path_matches: &[String],
        source_index_map: &AHashMap<String, usize>,
        scan_folder: &ScanFolderInfo,
        sources: &mut SourceFileRelocationContainer,
        exclude_metadata_files: bool,
    ) {
        let metadata_types = self.config.metadata_types();
        let mut seen: AHashSet<String> = AHashSet::new();

        for file in path_matches {
            for (idx, metadata) in metadata_types.iter().enumerate() {
                if ends_with_ignore_case(file, &format!(".{}", metadata.metadata_extension)) {
                    if exclude_metadata_files {
                        continue;
                    }
                    let normalized = normalize_file_path(file);
                    let database_name =
                        PlatformConfig::convert_to_relative_path(&normalized, scan_folder, false);
                    // Already present as a source in its own right.
                    if source_index_map.contains_key(&database_name) {
                        continue;
                    }
                    if seen.insert(normalized.to_lowercase()) {
                        sources.push(SourceFileRelocationInfo::from_metadata_file(
                            &normalized,
                            scan_folder,
                            idx,
                            None,
                        ));
                    }
                } else if !exclude_metadata_files
                    && (!metadata.replaces_extension()
                        || ends_with_ignore_case(file, &format!(".{}", metadata.source_extension)))
                {
                    let candidate = if metadata.replaces_extension() {
                        replace_extension(file, &metadata.metadata_extension)
                    } else {
                        format!("{}.{}", file, metadata.metadata_extension)
                    };

                    let Some(corrected) = self.find_with_correct_case(&candidate) else {
                        continue;
                    };
                    if seen.contains(&corrected.to_lowercase()) {
                        continue;
                    }

                    let database_name =
                        PlatformConfig::convert_to_relative_path(file, scan_folder, false);
                    if let Some(&owner) = source_index_map.get(&database_name) {
                        debug!("Found metadata file {} for {}", corrected, file);
                        seen.insert(corrected.to_lowercase());
                        sources.push(SourceFileRelocationInfo::from_metadata_file(
                            &corrected,
                            scan_folder,
                            idx,
                            Some(owner),
                        ));
                    }
                }
            }
        }
    }

    fn metadata_index_for(&self, file: &str) -> Option<usize> {
        self.config
            .metadata_types()
            .iter()
            .position(|t| ends_with_ignore_case(file, &format!(".{}", t.metadata_extension)))
    }

    /// The on-disk spelling of a file whose name may differ in case from `path`.
    fn find_with_correct_case(&self, path: &str) -> Option<String> {
        let directory = parent(path)?;
        let wanted = file_name(path).to_lowercase();
        let entries = self.config.file_io().list_dir(directory).ok()?;
        let actual = entries
            .into_iter()
            .find(|entry| entry.to_lowercase() == wanted)?;
        let corrected = normalize_file_path(&join(directory, &actual));
        if self.config.file_io().is_directory(&corrected) {
            return None;
        }
        Some(corrected)
    }

    /// Collects the source and product dependencies that point at each entry. Dependencies
    /// of a product on another product of the same source are not counted.
    pub fn populate_dependencies(&self, container: &mut SourceFileRelocationContainer) {
        for info in container.iter_mut() {
            if info.is_metadata_enabled_type {
                continue;
            }

            match self.db.query_source_dependency_by_depends_on_source(
                &info.source_entry.source_guid,
                &info.source_entry.source_name,
                &info.old_absolute_path,
            ) {
                Ok(rows) => {
                    for dependency in rows {
                        info.has_path_dependencies |= !dependency.from_asset_id;
                        info.source_dependency_entries.push(dependency);
                    }
                }
                Err(e) => error!(
                    "Source dependency query failed for {}: {}",
                    info.old_absolute_path, e
                ),
            }

            let product_dependencies = match self
                .db
                .query_product_dependencies_that_depend_on_source(info.source_entry.source_id)
            {
                Ok(rows) => rows,
                Err(e) => {
                    error!(
                        "Product dependency query failed for {}: {}",
                        info.old_absolute_path, e
                    );
                    continue;
                }
            };

            for dependency in product_dependencies {
                let dependent_source = match self.db.first_source_by_product_id(dependency.product_pk) {
                    Ok(source) => source,
                    Err(e) => {
                        error!("Source lookup failed for product {}: {}", dependency.product_pk, e);
                        None
                    }
                };

                let is_self_reference = dependent_source
                    .map(|source| source.source_id == info.source_entry.source_id)
                    .unwrap_or(false);

                if !is_self_reference {
                    info.has_path_dependencies |= !dependency.from_asset_id;
                    info.product_dependency_entries.push(dependency);
                }
            }
        }
    }
}

const ERR_DIRECTORY: &str = "Cannot operate on directories.  Please specify a file or use a wildcard to select all files within a directory.\n";
