mod cli;
mod logging;
mod reporter;

use anyhow::{Context, Result};
use asset_relocator::config::{load_configuration, AppConfig};
use asset_relocator::relocator::{write_csv, RelocationFlags, RelocationSuccess, SourceFileRelocator};
use asset_relocator::{
    scanner, FileIo, FileState, FileStateCache, FileStatePassthrough, LocalFileIo,
    LocalSourceControl, PlatformConfig, SqliteAssetDatabase,
};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, RelocationArgs};
use colored::*;
use dotenv::dotenv;
use reporter::CliReporter;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let config = match load_configuration() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {}", "Error loading configuration:".red(), err);
            process::exit(1);
        }
    };

    let _guard = logging::init_logger(&config);

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Move {
            source,
            destination,
            options,
        }) => run_move(&config, &source, &destination, &options),
        Some(Commands::Delete { source, options }) => run_delete(&config, &source, &options),
        Some(Commands::Scan) => run_scan(&config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

struct Session {
    db: Arc<SqliteAssetDatabase>,
    platform: Arc<PlatformConfig>,
}

/// Opens the database, registers the scan folders and warms the file cache.
fn open_session(config: &AppConfig) -> Result<Session> {
    let io: Arc<dyn FileIo> = Arc::new(LocalFileIo);
    let db = Arc::new(
        SqliteAssetDatabase::open(&config.database_path)
            .with_context(|| format!("opening asset database {}", config.database_path))?,
    );

    let file_state: Arc<dyn FileState> = if config.use_file_cache {
        Arc::new(FileStateCache::new(Arc::clone(&io)))
    } else {
        Arc::new(FileStatePassthrough::new(Arc::clone(&io)))
    };

    let mut platform = PlatformConfig::from_settings(config, Arc::clone(&file_state), io);
    for folder in platform.scan_folders_mut() {
        let portable_key = if folder.portable_key().is_empty() {
            folder.scan_path().to_lowercase()
        } else {
            folder.portable_key().to_string()
        };
        let id = db.upsert_scan_folder(
            folder.scan_path(),
            folder.display_name(),
            &portable_key,
            folder.is_root(),
        )?;
        folder.set_scan_folder_id(id);
    }

    if config.use_file_cache {
        let infos = scanner::scan_folders(platform.scan_folders(), &CliReporter::new())
            .context("scanning scan folders")?;
        file_state.add_info_set(infos);
    }

    Ok(Session {
        db,
        platform: Arc::new(platform),
    })
}

fn relocator(config: &AppConfig, session: &Session) -> SourceFileRelocator {
    let source_control = Arc::new(LocalSourceControl::new(Arc::clone(
        session.platform.file_io(),
    )));
    SourceFileRelocator::new(session.db.clone(), Arc::clone(&session.platform), source_control)
        .with_timeout(Duration::from_millis(config.source_control_timeout_ms))
}

fn flags(options: &RelocationArgs) -> RelocationFlags {
    RelocationFlags {
        preview_only: !options.confirm,
        allow_dependency_breaking: options.allow_broken_dependencies,
        remove_empty_folders: !options.leave_empty_folders,
        update_references: options.update_references,
        exclude_metadata_files: options.exclude_metadata_files,
        allow_non_database_files: options.allow_non_database_files,
    }
}

fn run_move(config: &AppConfig, source: &str, destination: &str, options: &RelocationArgs) -> Result<()> {
    let session = open_session(config)?;
    let relocator = relocator(config, &session);
    let flags = flags(options);

    match relocator.move_source(source, destination, flags) {
        Ok(result) => {
            println!(
                "{}",
                relocator.build_report(
                    &result.relocation_container,
                    &result.update_tasks,
                    true,
                    flags.update_references
                )
            );
            finish(&result, options, flags.preview_only, "moved")
        }
        Err(failure) => report_failure(failure),
    }
}

fn run_delete(config: &AppConfig, source: &str, options: &RelocationArgs) -> Result<()> {
    let session = open_session(config)?;
    let relocator = relocator(config, &session);
    let flags = flags(options);

    match relocator.delete(source, flags) {
        Ok(result) => {
            println!(
                "{}",
                relocator.build_report(&result.relocation_container, &result.update_tasks, false, false)
            );
            finish(&result, options, flags.preview_only, "deleted")
        }
        Err(failure) => report_failure(failure),
    }
}

fn finish(result: &RelocationSuccess, options: &RelocationArgs, preview: bool, verb: &str) -> Result<()> {
    if let Some(path) = &options.csv {
        write_csv(&result.relocation_container, path)
            .with_context(|| format!("writing report to {}", path))?;
        info!("Wrote {} rows to {}", result.relocation_container.len(), path);
    }

    if preview {
        info!(
            "Preview: {} files would be {}. Pass {} to apply.",
            format!("{}", result.move_total_count).cyan(),
            verb,
            "--confirm".yellow()
        );
        return Ok(());
    }

    info!(
        "{} {}, {} failed",
        format!("{}", result.move_success_count).green(),
        verb,
        format!("{}", result.move_failure_count).red(),
    );
    if result.update_total_count > 0 {
        info!(
            "{} references updated, {} failed",
            format!("{}", result.update_success_count).green(),
            format!("{}", result.update_failure_count).red(),
        );
    }
    Ok(())
}

fn report_failure(failure: asset_relocator::MoveFailure) -> Result<()> {
    error!("{}", failure.reason.trim_end().red());
    if failure.dependency_failure {
        info!(
            "Pass {} or {} to proceed anyway.",
            "--update-references".yellow(),
            "--allow-broken-dependencies".yellow()
        );
    }
    process::exit(1);
}

fn run_scan(config: &AppConfig) -> Result<()> {
    let session = open_session(config)?;
    for folder in session.platform.scan_folders() {
        info!(
            "{} {} (order {}, id {})",
            folder.display_name().cyan(),
            folder.scan_path(),
            folder.order(),
            folder.scan_folder_id()
        );
    }
    info!(
        "{} sources in database",
        format!("{}", session.db.source_count()?).green()
    );
    Ok(())
}
