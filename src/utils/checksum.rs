//! Content checksums for cached artifacts.
//!
//! Catalog items declare a SHA-256 `installer_item_hash`; a cached file whose
//! digest matches needs no network round trip.

use crate::error::{ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Calculates the hex SHA-256 of a file, reading in 8KB chunks.
pub async fn file_sha256(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Whether the file at `path` exists and hashes to `expected` (case-insensitive).
pub async fn matches_sha256(path: &Path, expected: &str) -> bool {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return false;
    }
    match file_sha256(path).await {
        Ok(actual) => actual.eq_ignore_ascii_case(expected.trim()),
        Err(e) => {
            log::debug!("Could not hash {}: {}", path.display(), e);
            false
        }
    }
}

/// Hex SHA-256 of an in-memory buffer.
pub fn bytes_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
