pub mod database;
pub mod models;
pub mod queries;
pub mod sqlite;

pub use database::{AssetDatabase, Rows};
pub use sqlite::SqliteAssetDatabase;
