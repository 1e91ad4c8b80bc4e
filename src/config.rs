use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

fn default_database_path() -> String {
    "assets.db".to_string()
}

fn default_source_control_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/relocator.log".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_source_control_timeout_ms")]
    pub source_control_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub use_file_cache: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub uuid_enabled_extensions: Vec<String>,
    #[serde(default)]
    pub scan_folders: Vec<ScanFolderSettings>,
    #[serde(default)]
    pub metadata_types: Vec<MetadataTypeSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanFolderSettings {
    pub path: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub portable_key: String,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default = "default_true")]
    pub recurse: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default = "default_true")]
    pub can_save_new_assets: bool,
    #[serde(default)]
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataTypeSettings {
    pub metadata_extension: String,
    /// Empty when the metadata file is named by appending to the full source file name.
    #[serde(default)]
    pub source_extension: String,
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("RELOCATOR"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_fill_missing_values() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                r#"
                [[scan_folders]]
                path = "/project/assets"
                order = 1

                [[metadata_types]]
                metadata_extension = "exportsettings"
                source_extension = "fbx"
                "#,
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database_path, "assets.db");
        assert_eq!(config.source_control_timeout_ms, 10_000);
        assert!(config.use_file_cache);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_file, "logs/relocator.log");
        assert_eq!(config.scan_folders.len(), 1);
        assert!(config.scan_folders[0].recurse);
        assert_eq!(config.scan_folders[0].order, 1);
        assert_eq!(config.metadata_types[0].source_extension, "fbx");
    }
}
