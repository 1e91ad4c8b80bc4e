//! String-level path helpers.
//!
//! Paths inside the pipeline are always handled as `/`-separated strings so that records written
//! on one operating system compare equal on another. Nothing in here touches the filesystem.

use uuid::Uuid;

pub const SEPARATOR: char = '/';
pub const WRONG_SEPARATOR: char = '\\';

/// Namespace for name-derived source UUIDs.
const SOURCE_UUID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b4e_93a7_4d0b_8c55_1e2a_7b90_c3d4);

pub fn to_forward_slashes(path: &str) -> String {
    path.replace(WRONG_SEPARATOR, "/")
}

/// Lexically clean a path: unify separators, drop empty and `.` segments, fold `..` into its
/// parent where one exists and remove any trailing separator. Never makes a path absolute.
pub fn normalize_file_path(path: &str) -> String {
    let unified = to_forward_slashes(path);
    if unified.is_empty() {
        return unified;
    }

    let rooted = unified.starts_with(SEPARATOR);
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." && !is_drive(last) => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut result = segments.join("/");
    if rooted {
        result.insert(0, SEPARATOR);
    }
    if result.is_empty() {
        result.push('.');
    }

    if cfg!(windows) {
        upper_case_drive_letter(&mut result);
    }

    result
}

/// Same as [`normalize_file_path`], with trailing separators guaranteed gone.
pub fn normalize_directory_path(path: &str) -> String {
    let mut dir = normalize_file_path(path);
    while dir.len() > 1 && dir.ends_with(SEPARATOR) {
        dir.pop();
    }
    dir
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn upper_case_drive_letter(path: &mut String) {
    if path.len() > 1 && path.as_bytes()[1] == b':' {
        let upper = path[..1].to_ascii_uppercase();
        path.replace_range(..1, &upper);
    }
}

pub fn is_relative(path: &str) -> bool {
    let unified = path.trim_start();
    if unified.starts_with(SEPARATOR) || unified.starts_with(WRONG_SEPARATOR) {
        return false;
    }
    let bytes = unified.as_bytes();
    !(bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Join a root and a relative name with exactly one separator between them.
pub fn join(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches([SEPARATOR, WRONG_SEPARATOR]);
    let relative = relative.trim_start_matches([SEPARATOR, WRONG_SEPARATOR]);
    if relative.is_empty() {
        return root.to_string();
    }
    if root.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", root, relative)
}

pub fn file_name(path: &str) -> &str {
    match path.rfind([SEPARATOR, WRONG_SEPARATOR]) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

pub fn parent(path: &str) -> Option<&str> {
    path.rfind([SEPARATOR, WRONG_SEPARATOR]).map(|idx| {
        if idx == 0 {
            &path[..1]
        } else {
            &path[..idx]
        }
    })
}

/// Extension of the last path segment, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// File name with its last extension removed.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Replace the extension of the last segment, or append one when there is none.
pub fn replace_extension(path: &str, new_extension: &str) -> String {
    let new_extension = new_extension.trim_start_matches('.');
    let name_start = path.len() - file_name(path).len();
    let base = match path[name_start..].rfind('.') {
        Some(0) | None => path,
        Some(idx) => &path[..name_start + idx],
    };
    if new_extension.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, new_extension)
    }
}

pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

pub fn starts_with_ignore_case(path: &str, prefix: &str) -> bool {
    match path.get(..prefix.len()) {
        Some(head) => eq_ignore_case(head, prefix),
        None => false,
    }
}

pub fn ends_with_ignore_case(path: &str, suffix: &str) -> bool {
    if suffix.len() > path.len() {
        return false;
    }
    match path.get(path.len() - suffix.len()..) {
        Some(tail) => eq_ignore_case(tail, suffix),
        None => false,
    }
}

/// Deterministic UUID for a scan-folder relative source name. Case and separator style do not
/// change the result.
pub fn create_safe_source_uuid(source_name: &str) -> Uuid {
    let lower = to_forward_slashes(source_name).to_lowercase();
    Uuid::new_v5(&SOURCE_UUID_NAMESPACE, lower.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unifies_separators_and_trims() {
        assert_eq!(normalize_file_path("C:\\dev\\project\\"), "C:/dev/project");
        assert_eq!(normalize_file_path("/root//a/./b/"), "/root/a/b");
        assert_eq!(normalize_file_path("/root/a/../b"), "/root/b");
        assert_eq!(normalize_file_path("../a/b"), "../a/b");
        assert_eq!(normalize_file_path("/"), "/");
    }

    #[test]
    fn test_is_relative() {
        assert!(is_relative("subfolder/file.txt"));
        assert!(!is_relative("/root/file.txt"));
        assert!(!is_relative("c:/root/file.txt"));
        assert!(!is_relative("\\\\server\\share"));
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension("/a/b/file.tar.gz"), Some("gz"));
        assert_eq!(extension("/a/b.dir/file"), None);
        assert_eq!(file_stem("dir/file.fbx"), "file");
        assert_eq!(replace_extension("dir/file.fbx", "exportsettings"), "dir/file.exportsettings");
        assert_eq!(replace_extension("dir.x/file", "meta"), "dir.x/file.meta");
    }

    #[test]
    fn test_join_and_parent() {
        assert_eq!(join("/root/", "/sub/file.txt"), "/root/sub/file.txt");
        assert_eq!(parent("/root/sub/file.txt"), Some("/root/sub"));
        assert_eq!(parent("/file.txt"), Some("/"));
        assert_eq!(parent("file.txt"), None);
    }

    #[test]
    fn test_source_uuid_ignores_case_and_separators() {
        let a = create_safe_source_uuid("Sub\\File.txt");
        let b = create_safe_source_uuid("sub/file.TXT");
        assert_eq!(a, b);
        assert_ne!(a, create_safe_source_uuid("sub/other.txt"));
    }
}
