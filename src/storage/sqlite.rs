use rusqlite::{Connection, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed asset database. The connection is serialized behind a mutex so the database
/// can be shared between threads as an `Arc<dyn AssetDatabase>`.
pub struct SqliteAssetDatabase {
    conn: Mutex<Connection>,
}

impl SqliteAssetDatabase {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = SqliteAssetDatabase {
            conn: Mutex::new(conn),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        debug!("Opened asset database at {}", path);
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = SqliteAssetDatabase {
            conn: Mutex::new(conn),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.connection().execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -16000;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 16MB cache)");
        Ok(())
    }

    /// Tables are created on first open. Older layouts carry nothing that can't be rebuilt by
    /// re-processing the project, so they are dropped.
    fn migrate_schema(&self) -> Result<()> {
        let conn = self.connection();
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version != 0 && version < SCHEMA_VERSION {
            debug!(
                "Schema version {} < {}, dropping all tables and recreating",
                version, SCHEMA_VERSION
            );
            conn.execute_batch(
                "DROP TABLE IF EXISTS product_dependencies;
                 DROP TABLE IF EXISTS source_dependencies;
                 DROP TABLE IF EXISTS products;
                 DROP TABLE IF EXISTS jobs;
                 DROP TABLE IF EXISTS sources;
                 DROP TABLE IF EXISTS scan_folders;",
            )?;
        }

        conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.connection().execute_batch(
            "DELETE FROM product_dependencies;
             DELETE FROM source_dependencies;
             DELETE FROM products;
             DELETE FROM jobs;
             DELETE FROM sources;
             DELETE FROM scan_folders;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}
