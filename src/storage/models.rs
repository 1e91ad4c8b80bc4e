use uuid::Uuid;

/// A configured scan folder as recorded in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFolderDatabaseEntry {
    pub scan_folder_id: i64,
    pub scan_folder: String,
    pub display_name: String,
    pub portable_key: String,
    pub is_root: bool,
}

/// An authored input file, identified by its scan folder and scan-folder relative name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDatabaseEntry {
    pub source_id: i64,
    pub scan_folder_id: i64,
    pub source_name: String,
    pub source_guid: Uuid,
}

impl SourceDatabaseEntry {
    /// Stand-in for a file that exists on disk but has no database row.
    pub fn placeholder(scan_folder_id: i64, source_name: &str) -> Self {
        Self {
            source_id: -1,
            scan_folder_id,
            source_name: source_name.to_string(),
            source_guid: Uuid::nil(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source_id < 0
    }
}

/// One processing job of a source for a single platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDatabaseEntry {
    pub job_id: i64,
    pub source_id: i64,
    pub platform: String,
    pub job_key: String,
}

/// A build output of a job. `(source guid, sub_id)` forms the asset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDatabaseEntry {
    pub product_id: i64,
    pub job_id: i64,
    pub sub_id: i32,
    pub product_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DependencyType {
    SourceToSource = 1,
    JobToJob = 2,
}

impl DependencyType {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(DependencyType::SourceToSource),
            2 => Some(DependencyType::JobToJob),
            _ => None,
        }
    }
}

/// `source_guid` declares a dependency on `depends_on_source`, which holds either a source
/// guid, a scan-folder relative name or an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileDependencyEntry {
    pub id: i64,
    pub source_guid: Uuid,
    pub depends_on_source: String,
    pub type_of_dependency: DependencyType,
    pub from_asset_id: bool,
}

/// The product `product_pk` depends on the product `(dependency_source_guid, dependency_sub_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDependencyDatabaseEntry {
    pub id: i64,
    pub product_pk: i64,
    pub dependency_source_guid: Uuid,
    pub dependency_sub_id: i32,
    pub platform: String,
    pub dependency_type: i32,
    pub from_asset_id: bool,
}
