use super::database::{AssetDatabase, Rows};
use super::models::*;
use super::sqlite::SqliteAssetDatabase;
use crate::error::Result;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Params, Row};
use tracing::debug;
use uuid::Uuid;

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<SourceDatabaseEntry> {
    Ok(SourceDatabaseEntry {
        source_id: row.get(0)?,
        scan_folder_id: row.get(1)?,
        source_name: row.get(2)?,
        source_guid: uuid_column(row, 3)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductDatabaseEntry> {
    Ok(ProductDatabaseEntry {
        product_id: row.get(0)?,
        job_id: row.get(1)?,
        sub_id: row.get(2)?,
        product_name: row.get(3)?,
    })
}

fn source_dependency_from_row(row: &Row<'_>) -> rusqlite::Result<SourceFileDependencyEntry> {
    let raw_type: i32 = row.get(3)?;
    let type_of_dependency = DependencyType::from_i32(raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Integer,
            format!("unknown dependency type {}", raw_type).into(),
        )
    })?;
    Ok(SourceFileDependencyEntry {
        id: row.get(0)?,
        source_guid: uuid_column(row, 1)?,
        depends_on_source: row.get(2)?,
        type_of_dependency,
        from_asset_id: row.get(4)?,
    })
}

fn product_dependency_from_row(row: &Row<'_>) -> rusqlite::Result<ProductDependencyDatabaseEntry> {
    Ok(ProductDependencyDatabaseEntry {
        id: row.get(0)?,
        product_pk: row.get(1)?,
        dependency_source_guid: uuid_column(row, 2)?,
        dependency_sub_id: row.get(3)?,
        platform: row.get(4)?,
        dependency_type: row.get(5)?,
        from_asset_id: row.get(6)?,
    })
}

fn scan_folder_from_row(row: &Row<'_>) -> rusqlite::Result<ScanFolderDatabaseEntry> {
    Ok(ScanFolderDatabaseEntry {
        scan_folder_id: row.get(0)?,
        scan_folder: row.get(1)?,
        display_name: row.get(2)?,
        portable_key: row.get(3)?,
        is_root: row.get(4)?,
    })
}

const SOURCE_COLUMNS: &str = "s.source_id, s.scan_folder_pk, s.source_name, s.source_guid";
const PRODUCT_COLUMNS: &str = "p.product_id, p.job_pk, p.sub_id, p.product_name";

impl SqliteAssetDatabase {
    fn query_rows<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Rows<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connection();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows.into_iter())
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Returns the id of the scan folder with this portable key, inserting it if needed.
    pub fn upsert_scan_folder(
        &self,
        scan_folder: &str,
        display_name: &str,
        portable_key: &str,
        is_root: bool,
    ) -> Result<i64> {
        let conn = self.connection();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT scan_folder_id FROM scan_folders WHERE portable_key = ?1",
                params![portable_key],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE scan_folders SET scan_folder = ?1, display_name = ?2, is_root = ?3 \
                 WHERE scan_folder_id = ?4",
                params![scan_folder, display_name, is_root, id],
            )?;
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO scan_folders (scan_folder, display_name, portable_key, is_root) \
             VALUES (?1, ?2, ?3, ?4)",
            params![scan_folder, display_name, portable_key, is_root],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Registered scan folder {} as {}", scan_folder, id);
        Ok(id)
    }

    pub fn insert_source(
        &self,
        scan_folder_id: i64,
        source_name: &str,
        source_guid: &Uuid,
    ) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO sources (scan_folder_pk, source_name, source_guid) VALUES (?1, ?2, ?3)",
            params![scan_folder_id, source_name, source_guid.to_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_job(&self, source_id: i64, platform: &str, job_key: &str) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO jobs (source_pk, platform, job_key) VALUES (?1, ?2, ?3)",
            params![source_id, platform, job_key],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_product(&self, job_id: i64, sub_id: i32, product_name: &str) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO products (job_pk, sub_id, product_name) VALUES (?1, ?2, ?3)",
            params![job_id, sub_id, product_name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_source_dependency(
        &self,
        source_guid: &Uuid,
        depends_on_source: &str,
        type_of_dependency: DependencyType,
        from_asset_id: bool,
    ) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO source_dependencies \
             (source_guid, depends_on_source, type_of_dependency, from_asset_id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                source_guid.to_string(),
                depends_on_source,
                type_of_dependency.as_i32(),
                from_asset_id
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_product_dependency(
        &self,
        product_pk: i64,
        dependency_source_guid: &Uuid,
        dependency_sub_id: i32,
        platform: &str,
        dependency_type: i32,
        from_asset_id: bool,
    ) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT INTO product_dependencies \
             (product_pk, dependency_source_guid, dependency_sub_id, platform, dependency_type, from_asset_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product_pk,
                dependency_source_guid.to_string(),
                dependency_sub_id,
                platform,
                dependency_type,
                from_asset_id
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn source_count(&self) -> Result<i64> {
        let count = self
            .connection()
            .query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl AssetDatabase for SqliteAssetDatabase {
    fn query_source_by_name_and_scan_folder(
        &self,
        source_name: &str,
        scan_folder_id: i64,
    ) -> Result<Rows<SourceDatabaseEntry>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM sources s \
                 WHERE s.source_name = ?1 COLLATE NOCASE AND s.scan_folder_pk = ?2",
                SOURCE_COLUMNS
            ),
            params![source_name, scan_folder_id],
            source_from_row,
        )
    }

    fn query_source_by_guid(&self, source_guid: &Uuid) -> Result<Rows<SourceDatabaseEntry>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM sources s WHERE s.source_guid = ?1 COLLATE NOCASE",
                SOURCE_COLUMNS
            ),
            params![source_guid.to_string()],
            source_from_row,
        )
    }

    fn query_source_by_product_id(&self, product_id: i64) -> Result<Rows<SourceDatabaseEntry>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM sources s \
                 JOIN jobs j ON j.source_pk = s.source_id \
                 JOIN products p ON p.job_pk = j.job_id \
                 WHERE p.product_id = ?1",
                SOURCE_COLUMNS
            ),
            params![product_id],
            source_from_row,
        )
    }

    fn query_products_by_source_id(&self, source_id: i64) -> Result<Rows<ProductDatabaseEntry>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM products p \
                 JOIN jobs j ON p.job_pk = j.job_id \
                 WHERE j.source_pk = ?1 \
                 ORDER BY p.product_id",
                PRODUCT_COLUMNS
            ),
            params![source_id],
            product_from_row,
        )
    }

    fn query_product_by_product_id(&self, product_id: i64) -> Result<Rows<ProductDatabaseEntry>> {
        self.query_rows(
            &format!("SELECT {} FROM products p WHERE p.product_id = ?1", PRODUCT_COLUMNS),
            params![product_id],
            product_from_row,
        )
    }

    fn query_product_by_source_guid_sub_id(
        &self,
        source_guid: &Uuid,
        sub_id: i32,
        platform: &str,
    ) -> Result<Rows<ProductDatabaseEntry>> {
        self.query_rows(
            &format!(
                "SELECT {} FROM products p \
                 JOIN jobs j ON p.job_pk = j.job_id \
                 JOIN sources s ON j.source_pk = s.source_id \
                 WHERE s.source_guid = ?1 COLLATE NOCASE AND p.sub_id = ?2 \
                   AND (?3 = '' OR j.platform = ?3)",
                PRODUCT_COLUMNS
            ),
            params![source_guid.to_string(), sub_id, platform],
            product_from_row,
        )
    }

    fn query_source_dependency_by_depends_on_source(
        &self,
        source_guid: &Uuid,
        source_name: &str,
        absolute_path: &str,
    ) -> Result<Rows<SourceFileDependencyEntry>> {
        self.query_rows(
            "SELECT id, source_guid, depends_on_source, type_of_dependency, from_asset_id \
             FROM source_dependencies \
             WHERE depends_on_source = ?1 COLLATE NOCASE \
                OR depends_on_source = ?2 COLLATE NOCASE \
                OR depends_on_source = ?3 COLLATE NOCASE \
             ORDER BY id",
            params![source_guid.to_string(), source_name, absolute_path],
            source_dependency_from_row,
        )
    }

    fn query_product_dependencies_that_depend_on_source(
        &self,
        source_id: i64,
    ) -> Result<Rows<ProductDependencyDatabaseEntry>> {
        self.query_rows(
            "SELECT pd.id, pd.product_pk, pd.dependency_source_guid, pd.dependency_sub_id, \
                    pd.platform, pd.dependency_type, pd.from_asset_id \
             FROM product_dependencies pd \
             JOIN sources s ON s.source_guid = pd.dependency_source_guid COLLATE NOCASE \
             WHERE s.source_id = ?1 \
             ORDER BY pd.id",
            params![source_id],
            product_dependency_from_row,
        )
    }

    fn query_scan_folder_by_id(&self, scan_folder_id: i64) -> Result<Rows<ScanFolderDatabaseEntry>> {
        self.query_rows(
            "SELECT scan_folder_id, scan_folder, display_name, portable_key, is_root \
             FROM scan_folders WHERE scan_folder_id = ?1",
            params![scan_folder_id],
            scan_folder_from_row,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_utils::create_safe_source_uuid;

    #[test]
    fn test_source_round_trip_by_name_and_guid() {
        let db = SqliteAssetDatabase::open_in_memory().unwrap();
        let folder = db.upsert_scan_folder("/root", "root", "root", false).unwrap();
        let guid = create_safe_source_uuid("sub/file.txt");
        let id = db.insert_source(folder, "sub/file.txt", &guid).unwrap();

        let by_name: Vec<_> = db
            .query_source_by_name_and_scan_folder("SUB/File.txt", folder)
            .unwrap()
            .collect();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].source_id, id);
        assert_eq!(by_name[0].source_guid, guid);

        assert_eq!(db.first_source_by_guid(&guid).unwrap().map(|s| s.source_id), Some(id));
        assert!(db.first_source_by_guid(&Uuid::nil()).unwrap().is_none());
    }

    #[test]
    fn test_upsert_scan_folder_reuses_portable_key() {
        let db = SqliteAssetDatabase::open_in_memory().unwrap();
        let first = db.upsert_scan_folder("/old", "a", "key", false).unwrap();
        let second = db.upsert_scan_folder("/new", "a", "key", true).unwrap();
        assert_eq!(first, second);

        let rows: Vec<_> = db.query_scan_folder_by_id(first).unwrap().collect();
        assert_eq!(rows[0].scan_folder, "/new");
        assert!(rows[0].is_root);
    }
}
