use crate::file_io::FileIo;
use std::hash::Hasher as _;
use std::io;
use twox_hash::XxHash64;

pub fn hash_data(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

/// Reads the whole file through `io` and hashes its contents.
pub fn hash_file(io: &dyn FileIo, absolute_path: &str) -> io::Result<u64> {
    let data = io.read(absolute_path)?;
    Ok(hash_data(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_data_is_stable() {
        assert_eq!(hash_data(b"asset"), hash_data(b"asset"));
        assert_ne!(hash_data(b"asset"), hash_data(b"Asset"));
    }
}
