use crate::path_utils::{SEPARATOR, WRONG_SEPARATOR};
use dashmap::DashMap;

/// Memo size at which the whole memo is dropped and rebuilt.
const MEMO_LIMIT: usize = 1 << 16;

/// Converts absolute paths into case-folded lookup keys, remembering recent conversions.
///
/// The memo only exists to speed up startup, where the same paths are converted over and over.
/// Clearing it is always safe.
#[derive(Debug, Default)]
pub struct PathKeys {
    memo: DashMap<String, String>,
}

impl PathKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_key(&self, absolute_path: &str) -> String {
        if let Some(key) = self.memo.get(absolute_path) {
            return key.value().clone();
        }

        let key = compute_key(absolute_path);
        if self.memo.len() >= MEMO_LIMIT {
            self.memo.clear();
        }
        self.memo.insert(absolute_path.to_string(), key.clone());
        key
    }

    pub fn clear(&self) {
        self.memo.clear();
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

/// Unify separators, drop empty and `.` segments and any trailing separator, then case-fold.
/// `..` segments are kept as they are.
pub fn compute_key(absolute_path: &str) -> String {
    let mut key = String::with_capacity(absolute_path.len());
    let rooted = absolute_path.starts_with([SEPARATOR, WRONG_SEPARATOR]);

    for segment in absolute_path.split([SEPARATOR, WRONG_SEPARATOR]) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if !key.is_empty() || rooted {
            key.push(SEPARATOR);
        }
        key.push_str(segment);
    }

    if key.is_empty() && rooted {
        key.push(SEPARATOR);
    }

    key.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_key_folds_case_and_separators() {
        assert_eq!(compute_key("C:\\Dev\\Project\\File.TXT"), "c:/dev/project/file.txt");
        assert_eq!(compute_key("/root//Sub/./file.txt/"), "/root/sub/file.txt");
        assert_eq!(compute_key("/root/a/../b"), "/root/a/../b");
        assert_eq!(compute_key("/"), "/");
    }

    #[test]
    fn test_memo_returns_same_key_and_clears() {
        let keys = PathKeys::new();
        let first = keys.to_key("/Root/File.txt");
        let second = keys.to_key("/Root/File.txt");
        assert_eq!(first, second);
        assert_eq!(keys.memo_len(), 1);

        keys.clear();
        assert_eq!(keys.memo_len(), 0);
        assert_eq!(keys.to_key("/Root/File.txt"), first);
    }
}
