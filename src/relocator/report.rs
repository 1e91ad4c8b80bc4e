use super::types::{
    guid_string, FileUpdateTasks, RelocationStatus, SourceFileRelocationContainer,
    SourceFileRelocationInfo,
};
use super::SourceFileRelocator;
use crate::error::Result;
use crate::path_utils::extension;
use crate::storage::models::{ProductDependencyDatabaseEntry, SourceFileDependencyEntry};
use csv::Writer;
use std::fmt::Write as _;
use tracing::error;
use uuid::Uuid;

pub(crate) const SEED_HELP_TEXT: &str = "\t\tPath hints in seed files may be out of date after references are fixed up. \
Run the AssetBundlerBatch to update the path hints. \
Only seed files active for the current project are updated; other seed files that reference this file must be fixed by hand.\n";

fn reference_kind(from_asset_id: bool) -> &'static str {
    if from_asset_id {
        "AssetId-based"
    } else {
        "Path-based"
    }
}

fn asset_id_string(guid: &Uuid, sub_id: i32) -> String {
    format!("{}:{:x}", guid_string(guid), sub_id)
}

/// Lists the rewrite tasks that failed, followed by the tasks that were skipped because the
/// file they depend on failed to move.
pub fn build_task_failure_report(update_tasks: &FileUpdateTasks) -> String {
    let mut report = String::new();
    let mut skipped_report = String::new();

    for task in update_tasks {
        if task.skip_task {
            if skipped_report.is_empty() {
                skipped_report.push_str("UPDATE SKIP REPORT:\nThe following files have a dependency on file(s) that failed to move.  These files were not updated:\n");
            }
            let _ = writeln!(skipped_report, "\t{}", task.abs_path_file_to_update);
        } else if !task.succeeded {
            if report.is_empty() {
                report.push_str("UPDATE FAILURE REPORT:\nThe following files have a dependency on file(s) that were moved and failed to be updated automatically.  They will need to be updated manually to fix broken references to moved files:\n");
            }
            let _ = writeln!(report, "\tFILE: {}", task.abs_path_file_to_update);
            for (old, new) in task.old_strings.iter().zip(&task.new_strings) {
                let _ = writeln!(report, "\t\tPOSSIBLE REFERENCE: {} -> UPDATE TO: {}", old, new);
            }
        }
    }

    if !report.is_empty() {
        report.push('\n');
    }
    report.push_str(&skipped_report);
    report
}

/// Writes one row per relocation entry.
pub fn write_csv(container: &SourceFileRelocationContainer, file_path: &str) -> Result<()> {
    let mut writer = Writer::from_path(file_path)?;

    writer.write_record([
        "source_id",
        "old_path",
        "new_path",
        "old_guid",
        "new_guid",
        "status",
        "source_dependencies",
        "product_dependencies",
        "metadata_file",
    ])?;

    for info in container {
        writer.write_record(&[
            info.source_entry.source_id.to_string(),
            info.old_relative_path.clone(),
            info.new_relative_path.clone(),
            guid_string(&info.source_entry.source_guid),
            if info.new_relative_path.is_empty() {
                String::new()
            } else {
                guid_string(&info.new_uuid)
            },
            match info.operation_status {
                RelocationStatus::None => "none",
                RelocationStatus::Failed => "failed",
                RelocationStatus::Succeeded => "succeeded",
            }
            .to_string(),
            info.source_dependency_entries.len().to_string(),
            info.product_dependency_entries.len().to_string(),
            info.is_metadata_file().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

impl SourceFileRelocator {
    /// Full textual report of a request: every file, every dependency on it and the outcome of
    /// any reference rewrites.
    pub fn build_report(
        &self,
        container: &SourceFileRelocationContainer,
        update_tasks: &FileUpdateTasks,
        is_move: bool,
        update_references: bool,
    ) -> String {
        let mut report = String::from("FILE REPORT:\n");

        for info in container {
            if info.is_metadata_file() {
                let _ = writeln!(
                    report,
                    "Metadata file CURRENT PATH: {}, NEW PATH: {}",
                    info.old_relative_path, info.new_relative_path
                );
            } else if is_move {
                let _ = writeln!(
                    report,
                    "SOURCEID: {}, CURRENT PATH: {}, NEW PATH: {}, CURRENT GUID: {}, NEW GUID: {}",
                    info.source_entry.source_id,
                    info.old_relative_path,
                    info.new_relative_path,
                    guid_string(&info.source_entry.source_guid),
                    guid_string(&info.new_uuid)
                );
            } else {
                let _ = writeln!(
                    report,
                    "SOURCEID: {}, CURRENT PATH: {}, CURRENT GUID: {}",
                    info.source_entry.source_id,
                    info.old_relative_path,
                    guid_string(&info.source_entry.source_guid)
                );
            }

            if !info.source_dependency_entries.is_empty() {
                let _ = writeln!(
                    report,
                    "\t{}:",
                    if update_references {
                        " The following files have a source / job dependency on this file, we will attempt to fix the references but they may still break"
                    } else {
                        "The following files have a source / job dependency on this file and will break"
                    }
                );
                for dependency in &info.source_dependency_entries {
                    let name = self.dependent_source_name(dependency);
                    let _ = writeln!(
                        report,
                        "\t\tUUID: {}, TYPE: {}, {}",
                        name,
                        dependency.type_of_dependency.as_i32(),
                        reference_kind(dependency.from_asset_id)
                    );
                    report.push_str(self.help_text_for(&name));
                }
            }

            if !info.product_dependency_entries.is_empty() {
                let _ = writeln!(
                    report,
                    "\t{}:",
                    if update_references {
                        " The following files have a product dependency on one or more of the products generated by this file, we will attempt to fix the references but they may still break"
                    } else {
                        "The following files have a product dependency on one or more of the products generated by this file and will break"
                    }
                );
                for dependency in &info.product_dependency_entries {
                    let line = self.product_dependency_line(info, dependency);
                    let _ = writeln!(report, "\t\t{}", line);
                }
            }
        }

        report.push_str(&build_task_failure_report(update_tasks));
        report
    }

    /// Shorter report of what rewriting will be attempted.
    pub fn build_change_report(
        &self,
        container: &SourceFileRelocationContainer,
        update_tasks: &FileUpdateTasks,
    ) -> String {
        let mut report = String::new();

        for info in container {
            if !info.source_dependency_entries.is_empty() {
                report.push_str("The following files have a source / job dependency on this file, we will attempt to fix the references but they may still break.:\n");
                for dependency in &info.source_dependency_entries {
                    let name = self.dependent_source_name(dependency);
                    let _ = writeln!(
                        report,
                        "\nPATH: {}, TYPE: {}, {}",
                        name,
                        dependency.type_of_dependency.as_i32(),
                        reference_kind(dependency.from_asset_id)
                    );
                    report.push_str(self.help_text_for(&name));
                }
            }

            if !info.product_dependency_entries.is_empty() {
                report.push_str("The following files have a product dependency on one or more of the products generated by this file, we will attempt to fix the references but they may still break:\n");
                for dependency in &info.product_dependency_entries {
                    let line = self.product_dependency_line(info, dependency);
                    let _ = writeln!(report, "\n{}", line);
                }
            }
        }

        report.push_str(&build_task_failure_report(update_tasks));
        report
    }

    fn help_text_for(&self, source_name: &str) -> &str {
        extension(source_name)
            .and_then(|ext| self.additional_help_text.get(&ext.to_lowercase()))
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn dependent_source_name(&self, dependency: &SourceFileDependencyEntry) -> String {
        match self.db.first_source_by_guid(&dependency.source_guid) {
            Ok(Some(source)) => source.source_name,
            Ok(None) => String::new(),
            Err(e) => {
                error!("Source lookup failed for {}: {}", dependency.source_guid, e);
                String::new()
            }
        }
    }

    fn product_dependency_line(
        &self,
        info: &SourceFileRelocationInfo,
        dependency: &ProductDependencyDatabaseEntry,
    ) -> String {
        let dependent_source = self
            .db
            .first_source_by_product_id(dependency.product_pk)
            .ok()
            .flatten();
        let dependent_product = self
            .db
            .query_product_by_product_id(dependency.product_pk)
            .ok()
            .and_then(|mut rows| rows.next());
        let depends_on = info
            .products
            .get(&dependency.dependency_sub_id)
            .map(|product| product.product_name.clone())
            .unwrap_or_default();

        let asset_id = asset_id_string(
            &dependent_source
                .map(|source| source.source_guid)
                .unwrap_or_else(Uuid::nil),
            dependent_product.as_ref().map(|p| p.sub_id).unwrap_or_default(),
        );

        format!(
            "PATH: {}, DEPENDS ON PRODUCT: {}, ASSETID: {}, TYPE: {}, {}",
            dependent_product
                .map(|product| product.product_name)
                .unwrap_or_default(),
            depends_on,
            asset_id,
            dependency.dependency_type,
            reference_kind(dependency.from_asset_id)
        )
    }
}
