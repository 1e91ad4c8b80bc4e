use crate::path_utils::eq_ignore_case;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Raw metadata for a single path as reported by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: SystemTime,
    pub is_directory: bool,
}

/// Synchronous file access used by the passthrough file state, the cache's on-demand hashing and
/// the reference rewriter.
pub trait FileIo: Send + Sync {
    fn exists(&self, path: &str) -> bool {
        self.metadata(path).is_ok()
    }

    fn is_directory(&self, path: &str) -> bool {
        self.metadata(path).map(|m| m.is_directory).unwrap_or(false)
    }

    fn metadata(&self, path: &str) -> io::Result<FileMetadata>;

    /// Names of the direct children of a directory.
    fn list_dir(&self, path: &str) -> io::Result<Vec<String>>;

    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()>;

    fn remove_file(&self, path: &str) -> io::Result<()>;

    /// Removes the directory only if it is empty.
    fn remove_empty_dir(&self, path: &str) -> io::Result<()>;

    /// Renames a file, creating the destination's parent directories first. Fails with
    /// `AlreadyExists` rather than replacing another file at `to`.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileIo;

impl FileIo for LocalFileIo {
    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn is_directory(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn metadata(&self, path: &str) -> io::Result<FileMetadata> {
        let metadata = fs::metadata(path)?;
        Ok(FileMetadata {
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            modified: metadata.modified()?,
            is_directory: metadata.is_dir(),
        })
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn remove_file(&self, path: &str) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_empty_dir(&self, path: &str) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        // A case-only rename reports the source itself as the existing target.
        if Path::new(to).exists() && !eq_ignore_case(from, to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination {} already exists", to),
            ));
        }
        if let Some(parent) = Path::new(to).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::rename(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rename_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let from = tmp.path().join("a.txt");
        let to = tmp.path().join("nested/deeper/a.txt");
        fs::write(&from, "a").unwrap();

        LocalFileIo
            .rename(&from.to_string_lossy(), &to.to_string_lossy())
            .unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "a");
    }

    #[test]
    fn test_rename_keeps_existing_destination() {
        let tmp = tempdir().unwrap();
        let from = tmp.path().join("a.txt");
        let to = tmp.path().join("b.txt");
        fs::write(&from, "a").unwrap();
        fs::write(&to, "keep me").unwrap();

        let err = LocalFileIo
            .rename(&from.to_string_lossy(), &to.to_string_lossy())
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&from).unwrap(), "a");
        assert_eq!(fs::read_to_string(&to).unwrap(), "keep me");
    }
}
