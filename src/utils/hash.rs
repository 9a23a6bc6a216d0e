use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use sha2::{Sha256, Digest};

const BUFFER_SIZE: usize = 1024 * 1024; // 1MB buffer

/// Calculate SHA-256 hash of a file
///
/// Returns None if:
/// - The file is empty or larger than max_size_mb
/// - The path is not a regular file
pub fn calculate_sha256(path: &Path, max_size_mb: u64) -> io::Result<Option<String>> {
    let metadata = std::fs::symlink_metadata(path)?;

    if !metadata.is_file() {
        return Ok(None);
    }

    let size = metadata.len();
    if size == 0 || size > max_size_mb.saturating_mul(1024 * 1024) {
        return Ok(None);
    }

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Some(format!("{:x}", hasher.finalize())))
}
