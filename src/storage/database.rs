use super::models::*;
use crate::error::Result;
use uuid::Uuid;

/// Rows returned by a single query. Each call runs the query afresh; stopping early is done by
/// dropping the iterator.
pub type Rows<T> = std::vec::IntoIter<T>;

/// Read-only view of the asset database used by the relocator.
///
/// Queries are independent round trips with no snapshot spanning several of them. An `Err`
/// means the query itself failed; callers that accumulate rows from several queries keep
/// whatever they collected before the failure.
pub trait AssetDatabase: Send + Sync {
    fn query_source_by_name_and_scan_folder(
        &self,
        source_name: &str,
        scan_folder_id: i64,
    ) -> Result<Rows<SourceDatabaseEntry>>;

    fn query_source_by_guid(&self, source_guid: &Uuid) -> Result<Rows<SourceDatabaseEntry>>;

    fn query_source_by_product_id(&self, product_id: i64) -> Result<Rows<SourceDatabaseEntry>>;

    fn query_products_by_source_id(&self, source_id: i64) -> Result<Rows<ProductDatabaseEntry>>;

    fn query_product_by_product_id(&self, product_id: i64) -> Result<Rows<ProductDatabaseEntry>>;

    /// Products with the given asset id. An empty `platform` matches every platform.
    fn query_product_by_source_guid_sub_id(
        &self,
        source_guid: &Uuid,
        sub_id: i32,
        platform: &str,
    ) -> Result<Rows<ProductDatabaseEntry>>;

    /// Source dependencies whose target is this source, referenced by guid, by relative name or
    /// by absolute path.
    fn query_source_dependency_by_depends_on_source(
        &self,
        source_guid: &Uuid,
        source_name: &str,
        absolute_path: &str,
    ) -> Result<Rows<SourceFileDependencyEntry>>;

    /// Product dependencies whose target is any product of the given source.
    fn query_product_dependencies_that_depend_on_source(
        &self,
        source_id: i64,
    ) -> Result<Rows<ProductDependencyDatabaseEntry>>;

    fn query_scan_folder_by_id(&self, scan_folder_id: i64) -> Result<Rows<ScanFolderDatabaseEntry>>;

    fn first_source_by_guid(&self, source_guid: &Uuid) -> Result<Option<SourceDatabaseEntry>> {
        Ok(self.query_source_by_guid(source_guid)?.next())
    }

    fn first_source_by_product_id(&self, product_id: i64) -> Result<Option<SourceDatabaseEntry>> {
        Ok(self.query_source_by_product_id(product_id)?.next())
    }
}
