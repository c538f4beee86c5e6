// Content hashing
// `hash` covers every byte; `checksum` only the head, the tail and the
// size, which is enough to tell files apart during a walk.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::constants::{HASH_ALGORITHM, HASH_CHUNK_SIZE, HASH_FAST_SCHEME};
use crate::error::{CatalogError, Result};

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| CatalogError::UnreadableFile(format!("{}: {}", path.display(), e)))
}

fn feed_range(hasher: &mut blake3::Hasher, file: &mut File, offset: u64, len: usize) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    hasher.update(&buf);
    Ok(())
}

/// "blake3:first_last_size_v1:<hex>"
pub fn compute_checksum(path: &Path) -> Result<String> {
    let mut file = open(path)?;
    let size = file.metadata()?.len();
    let chunk = HASH_CHUNK_SIZE as u64;

    let mut hasher = blake3::Hasher::new();
    feed_range(&mut hasher, &mut file, 0, size.min(chunk) as usize)?;
    if size > chunk {
        feed_range(&mut hasher, &mut file, size - chunk, HASH_CHUNK_SIZE)?;
    }
    hasher.update(&size.to_le_bytes());

    Ok(format!("{}:{}:{}", HASH_ALGORITHM, HASH_FAST_SCHEME, hasher.finalize().to_hex()))
}

/// "blake3:full:<hex>"
pub fn compute_hash(path: &Path) -> Result<String> {
    let mut file = open(path)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(&mut file)?;
    Ok(format!("{}:full:{}", HASH_ALGORITHM, hasher.finalize().to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_full_hash_matches_in_memory_hash() {
        let file = temp_with(b"Hello, World!");
        let hash = compute_hash(file.path()).unwrap();
        assert_eq!(hash, format!("blake3:full:{}", blake3::hash(b"Hello, World!").to_hex()));
    }

    #[test]
    fn test_checksum_ignores_middle_of_large_files() {
        let mut a = vec![1u8; HASH_CHUNK_SIZE * 3];
        let mut b = a.clone();
        a[HASH_CHUNK_SIZE + 10] = 7;
        b[HASH_CHUNK_SIZE + 10] = 9;

        let (fa, fb) = (temp_with(&a), temp_with(&b));
        let ca = compute_checksum(fa.path()).unwrap();
        assert!(ca.starts_with("blake3:first_last_size_v1:"));
        assert_eq!(ca, compute_checksum(fb.path()).unwrap());
        assert_ne!(compute_hash(fa.path()).unwrap(), compute_hash(fb.path()).unwrap());
    }

    #[test]
    fn test_checksum_includes_size() {
        let short = temp_with(b"abc");
        let long = temp_with(b"abc\0");
        assert_ne!(
            compute_checksum(short.path()).unwrap(),
            compute_checksum(long.path()).unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = compute_hash(Path::new("/nonexistent/file.jpg")).unwrap_err();
        assert!(matches!(err, CatalogError::UnreadableFile(_)));
    }
}
