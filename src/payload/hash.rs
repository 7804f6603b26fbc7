//! Content hashing for payload files.

use super::error::{ErrorExt, Result};
use sha2::{Digest, Sha512};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Content digest and byte length of one file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContentHash {
    /// SHA-512 of the full content, uppercase hex (128 characters)
    pub hash: String,
    /// Exact number of bytes hashed
    pub size: u64,
}

/// Hashes a file with SHA-512.
///
/// Reads in 64KB chunks so arbitrarily large payloads never sit in memory
/// at once. The digest depends on content only, never on the file name.
pub async fn hash_file(path: &Path) -> Result<ContentHash> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening payload for hashing", path)?;
    let mut hasher = Sha512::new();
    let mut buffer = vec![0u8; 64 * 1024];
    let mut size = 0u64;

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading payload for hashing", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        size += n as u64;
    }

    Ok(ContentHash {
        hash: hex::encode_upper(hasher.finalize()),
        size,
    })
}
