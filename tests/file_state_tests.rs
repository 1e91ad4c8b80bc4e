use asset_relocator::path_utils::to_forward_slashes;
use asset_relocator::{FileState, FileStateCache, FileStateInfo, FileStatePassthrough, LocalFileIo};
use chrono::{TimeZone, Utc};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn cache() -> FileStateCache {
    FileStateCache::new(Arc::new(LocalFileIo))
}

#[test]
fn test_base_file_scenario() {
    let cache = cache();
    let time = Utc.with_ymd_and_hms(2023, 5, 17, 12, 0, 0).unwrap();
    cache.add_info_set(vec![
        FileStateInfo::new("/root/subfolder3", time, 0, true),
        FileStateInfo::new("/root/subfolder3/BaseFile.txt", time, 10, false),
    ]);

    let info = cache.get_file_info("/root/subfolder3/BaseFile.txt").unwrap();
    assert_eq!(info.absolute_path, "/root/subfolder3/BaseFile.txt");
    assert_eq!(info.mod_time, time);
    assert_eq!(info.size, 10);
    assert!(!info.is_directory);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    cache.register_for_delete_event(Box::new(move |info| {
        sink.lock().unwrap().push(info.absolute_path.clone());
    }));

    cache.remove_file("/root/subfolder3");

    assert_eq!(*events.lock().unwrap(), vec!["/root/subfolder3".to_string()]);
    assert!(!cache.exists("/root/subfolder3/BaseFile.txt"));
    assert!(!cache.exists("/root/subfolder3"));
}

#[test]
fn test_lookups_ignore_case() {
    let cache = cache();
    let time = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    cache.add_info_set(vec![FileStateInfo::new("/Root/Mixed/File.TXT", time, 4, false)]);

    for path in [
        "/Root/Mixed/File.TXT",
        "/ROOT/MIXED/FILE.TXT",
        "/root/mixed/file.txt",
        "\\root\\mixed\\file.txt",
    ] {
        assert!(cache.exists(path), "{} should exist", path);
        assert_eq!(
            cache.get_file_info(path).unwrap().absolute_path,
            "/Root/Mixed/File.TXT"
        );
    }
}

#[test]
fn test_directory_removal_fires_one_event() {
    let cache = cache();
    let time = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    cache.add_info_set(vec![
        FileStateInfo::new("/root/dir", time, 0, true),
        FileStateInfo::new("/root/dir/a.txt", time, 1, false),
        FileStateInfo::new("/root/dir/sub", time, 0, true),
        FileStateInfo::new("/root/dir/sub/b.txt", time, 1, false),
        FileStateInfo::new("/root/dirt.txt", time, 1, false),
    ]);

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    cache.register_for_delete_event(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    cache.remove_file("/ROOT/DIR");

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!cache.exists("/root/dir/a.txt"));
    assert!(!cache.exists("/root/dir/sub/b.txt"));
    // Shares a prefix with the directory name but is not inside it.
    assert!(cache.exists("/root/dirt.txt"));
}

#[test]
fn test_add_file_reflects_disk() {
    let tmp = tempdir().unwrap();
    let path = to_forward_slashes(&tmp.path().join("new.txt").to_string_lossy());
    fs::write(&path, "12345").unwrap();

    let cache = cache();
    cache.add_file(&path);

    let info = cache.get_file_info(&path).unwrap();
    assert_eq!(info.absolute_path, path);
    assert_eq!(info.size, 5);
    assert!(!info.is_directory);
}

#[test]
fn test_add_directory_adds_contents() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("d/e")).unwrap();
    fs::write(tmp.path().join("d/e/f.txt"), "f").unwrap();
    let dir = to_forward_slashes(&tmp.path().join("d").to_string_lossy());

    let cache = cache();
    cache.add_file(&dir);

    assert!(cache.get_file_info(&dir).unwrap().is_directory);
    assert!(cache.exists(&format!("{}/e/f.txt", dir)));
}

#[test]
fn test_hash_is_memoized_until_invalidated() {
    let tmp = tempdir().unwrap();
    let path = to_forward_slashes(&tmp.path().join("hashed.txt").to_string_lossy());
    fs::write(&path, "first contents").unwrap();

    let cache = cache();
    cache.add_file(&path);
    let first = cache.get_hash(&path).unwrap();

    // The cached hash is served even though the file changed underneath.
    fs::write(&path, "second contents").unwrap();
    assert_eq!(cache.get_hash(&path), Some(first));

    let info = cache.get_file_info(&path).unwrap();
    cache.warm_up_cache(info, None);
    let second = cache.get_hash(&path).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_passthrough_reads_disk_every_time() {
    let tmp = tempdir().unwrap();
    let path = to_forward_slashes(&tmp.path().join("live.txt").to_string_lossy());

    let state = FileStatePassthrough::new(Arc::new(LocalFileIo));
    assert!(!state.exists(&path));

    fs::write(&path, "abc").unwrap();
    assert_eq!(state.get_file_info(&path).unwrap().size, 3);

    fs::remove_file(&path).unwrap();
    assert!(!state.exists(&path));
}
