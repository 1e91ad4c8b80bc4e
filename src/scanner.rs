use crate::file_state::FileStateInfo;
use crate::path_utils::to_forward_slashes;
use crate::progress::ProgressReporter;
use crate::scan_folder::ScanFolderInfo;
use dashmap::DashMap;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{error, info, warn};

const PROGRESS_INTERVAL: usize = 1000;

/// Parallel traversal of every scan folder, producing one [`FileStateInfo`] per file and
/// directory found. The scan-folder roots themselves are included. Non-recursive folders only
/// contribute their direct children. Symlinks are skipped.
pub fn scan_folders(
    folders: &[ScanFolderInfo],
    reporter: &dyn ProgressReporter,
) -> io::Result<Vec<FileStateInfo>> {
    let start = Instant::now();
    reporter.on_scan_start(folders.len());

    // Keyed by lower-cased path so nested scan folders don't produce duplicates.
    let found: DashMap<String, FileStateInfo> = DashMap::new();
    let counter = AtomicUsize::new(0);

    folders.par_iter().try_for_each(|folder| {
        let root = Path::new(folder.scan_path());
        if !root.is_dir() {
            warn!("Scan folder {} does not exist, skipping", folder.scan_path());
            return Ok(());
        }
        record(root, &found, &counter, reporter)?;
        visit_dirs(root, folder.recurse(), &found, &counter, reporter)
    })?;

    let infos: Vec<FileStateInfo> = found.into_iter().map(|(_, info)| info).collect();
    let duration = start.elapsed().as_secs_f64();
    info!(
        "Scanned {} scan folders: {} entries in {:.2}s",
        folders.len(),
        infos.len(),
        duration
    );
    reporter.on_scan_complete(infos.len(), duration);
    Ok(infos)
}

fn record(
    path: &Path,
    found: &DashMap<String, FileStateInfo>,
    counter: &AtomicUsize,
    reporter: &dyn ProgressReporter,
) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    let absolute = to_forward_slashes(&path.to_string_lossy());
    let info = FileStateInfo::new(
        absolute.clone(),
        metadata.modified()?.into(),
        if metadata.is_dir() { 0 } else { metadata.len() },
        metadata.is_dir(),
    );
    found.insert(absolute.to_lowercase(), info);

    let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
    if count % PROGRESS_INTERVAL == 0 {
        reporter.on_scan_progress(count, &absolute);
    }
    Ok(())
}

fn visit_dirs(
    dir: &Path,
    recurse: bool,
    found: &DashMap<String, FileStateInfo>,
    counter: &AtomicUsize,
    reporter: &dyn ProgressReporter,
) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!("Access denied reading directory {}: {}", dir.display(), err);
                return Ok(());
            } else {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        }
    };

    entries.par_bridge().try_for_each(|entry_result| {
        let entry = entry_result.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            )
        })?;

        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            return Ok(());
        }

        record(&path, found, counter, reporter)?;

        if file_type.is_dir() && recurse {
            visit_dirs(&path, recurse, found, counter, reporter)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use tempfile::tempdir;

    #[test]
    fn test_non_recursive_folder_only_lists_children() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("top.txt"), "top").unwrap();
        fs::write(tmp.path().join("a/b/deep.txt"), "deep").unwrap();

        let root = tmp.path().to_string_lossy().into_owned();
        let shallow = ScanFolderInfo::new(&root, "root", "root").with_recurse(false);
        let infos = scan_folders(&[shallow], &SilentReporter).unwrap();
        assert_eq!(infos.len(), 3); // root, top.txt, a

        let deep = ScanFolderInfo::new(&root, "root", "root");
        let infos = scan_folders(&[deep], &SilentReporter).unwrap();
        assert_eq!(infos.len(), 5);
        assert!(infos
            .iter()
            .any(|info| info.absolute_path.ends_with("a/b/deep.txt") && info.size == 4));
    }
}
