//! Moving and deleting source files together with their companion files, and repairing the
//! references other files hold to them.
//!
//! A request goes through resolution, dependency lookup, destination computation (moves only),
//! the dependency-safety check, the physical operation and finally reference rewriting.
//! Everything up to the physical operation can fail the whole request; from there on failures
//! are counted per file.

pub mod destination;
pub mod operations;
pub mod references;
pub mod report;
pub mod resolve;
pub mod types;

use crate::path_utils::{normalize_file_path, to_forward_slashes};
use crate::scan_folder::PlatformConfig;
use crate::source_control::{SourceControl, DEFAULT_TIMEOUT};
use crate::storage::AssetDatabase;
use ahash::AHashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use destination::{fix_destination_missing_filename, handle_wildcard, ERR_CROSS_DIRECTORY};
pub use references::{compute_product_dependency_update_paths, update_file_references};
pub use report::{build_task_failure_report, write_csv};
pub use types::{
    guid_string, FileUpdateTask, FileUpdateTasks, MoveFailure, RelocationFlags, RelocationStatus,
    RelocationSuccess, SourceFileRelocationContainer, SourceFileRelocationInfo,
};

const ERR_MOVE_DEPENDENCIES: &str = "Move failed.  There are files that have dependencies that may break as a result of being moved/renamed.\n";
const ERR_DELETE_DEPENDENCIES: &str = "Delete failed.  There are files that have dependencies that may break as a result of being deleted.\n";

pub struct SourceFileRelocator {
    db: Arc<dyn AssetDatabase>,
    config: Arc<PlatformConfig>,
    source_control: Arc<dyn SourceControl>,
    timeout: Duration,
    /// Extra report text for dependents, keyed by lower-case extension.
    additional_help_text: AHashMap<String, String>,
}

impl SourceFileRelocator {
    pub fn new(
        db: Arc<dyn AssetDatabase>,
        config: Arc<PlatformConfig>,
        source_control: Arc<dyn SourceControl>,
    ) -> Self {
        let mut additional_help_text = AHashMap::new();
        additional_help_text.insert("seed".to_string(), report::SEED_HELP_TEXT.to_string());

        Self {
            db,
            config,
            source_control,
            timeout: DEFAULT_TIMEOUT,
            additional_help_text,
        }
    }

    /// How long to wait for each source control round trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &Arc<PlatformConfig> {
        &self.config
    }

    /// Moves or renames every source matched by `source` to `destination`. Both may contain
    /// `*` wildcards, in equal number.
    pub fn move_source(
        &self,
        source: &str,
        destination: &str,
        flags: RelocationFlags,
    ) -> Result<RelocationSuccess, MoveFailure> {
        // Only unify separators: trailing separators and wildcards must survive.
        let source = to_forward_slashes(source);
        let destination = to_forward_slashes(destination);

        let mut container = SourceFileRelocationContainer::new();
        let source_scan_folder = self
            .get_sources_by_path(
                &source,
                &mut container,
                flags.exclude_metadata_files,
                flags.allow_non_database_files,
            )
            .map_err(MoveFailure::new)?;

        if container.is_empty() {
            return Ok(RelocationSuccess::default());
        }

        self.populate_dependencies(&mut container);
        let destination_scan_folder = self
            .compute_destination(&mut container, &source_scan_folder, &source, &destination)
            .map_err(MoveFailure::new)?;

        let mut error_count = 0;
        let mut update_tasks = FileUpdateTasks::new();

        if !flags.preview_only {
            if !flags.update_references
                && !flags.allow_dependency_breaking
                && container.iter().any(|info| info.has_dependencies())
            {
                return Err(MoveFailure::dependency(ERR_MOVE_DEPENDENCIES));
            }

            error_count = self.do_move(
                &source,
                &destination,
                &mut container,
                &source_scan_folder,
                &destination_scan_folder,
                flags.remove_empty_folders,
            );

            if flags.update_references {
                update_tasks = self.update_references(&container);
            }
        }

        let result = RelocationSuccess::new(container, error_count, update_tasks);
        info!(
            "Move complete: {} moved, {} failed, {} references updated",
            result.move_success_count, result.move_failure_count, result.update_success_count
        );
        Ok(result)
    }

    /// Deletes every source matched by `source`, which may contain `*` wildcards.
    pub fn delete(&self, source: &str, flags: RelocationFlags) -> Result<RelocationSuccess, MoveFailure> {
        let source = normalize_file_path(source);

        let mut container = SourceFileRelocationContainer::new();
        let scan_folder = self
            .get_sources_by_path(
                &source,
                &mut container,
                flags.exclude_metadata_files,
                flags.allow_non_database_files,
            )
            .map_err(MoveFailure::new)?;

        if container.is_empty() {
            return Ok(RelocationSuccess::default());
        }

        self.populate_dependencies(&mut container);

        let mut error_count = 0;
        if !flags.preview_only {
            if !flags.allow_dependency_breaking && container.iter().any(|info| info.has_dependencies()) {
                return Err(MoveFailure::dependency(ERR_DELETE_DEPENDENCIES));
            }

            error_count = self.do_delete(&source, &mut container, &scan_folder, flags.remove_empty_folders);
        }

        let result = RelocationSuccess::new(container, error_count, FileUpdateTasks::new());
        info!(
            "Delete complete: {} deleted, {} failed",
            result.move_success_count, result.move_failure_count
        );
        Ok(result)
    }
}
