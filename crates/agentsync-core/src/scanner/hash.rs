//! Content digests using SHA-256

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const PREFIX: &str = "sha256:";

/// Content-derived, path-independent digest rendered as `sha256:<hex>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest of an in-memory buffer
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::from_hasher(Sha256::new_with_prefix(bytes))
    }

    fn from_hasher(hasher: Sha256) -> Self {
        let raw: [u8; 32] = hasher.finalize().into();
        let mut rendered = String::with_capacity(PREFIX.len() + 64);
        rendered.push_str(PREFIX);
        for byte in raw {
            // Writing to a String cannot fail
            let _ = write!(rendered, "{byte:02x}");
        }
        Self(rendered)
    }

    /// Digest rendering, e.g. `sha256:9f86d0...`
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First hex characters, for compact display
    #[must_use]
    pub fn short(&self) -> &str {
        let hex = self.0.strip_prefix(PREFIX).unwrap_or(&self.0);
        hex.get(..12).unwrap_or(hex)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File hasher
pub struct FileHasher;

impl Default for FileHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHasher {
    /// Create a new file hasher
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compute the digest of a file by streaming its contents
    pub fn hash(path: &Path) -> Result<ContentDigest> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buffer = [0; 8192];

        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|e| Error::io(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(ContentDigest::from_hasher(hasher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_identical_files() {
        let tmp = TempDir::new().unwrap();
        let file1 = tmp.path().join("file1.txt");
        let file2 = tmp.path().join("nested/file2.txt");
        fs::create_dir_all(tmp.path().join("nested")).unwrap();

        fs::write(&file1, "same content").unwrap();
        fs::write(&file2, "same content").unwrap();

        assert_eq!(FileHasher::hash(&file1).unwrap(), FileHasher::hash(&file2).unwrap());
    }

    #[test]
    fn test_hash_different_files() {
        let tmp = TempDir::new().unwrap();
        let file1 = tmp.path().join("file1.txt");
        let file2 = tmp.path().join("file2.txt");

        fs::write(&file1, "content 1").unwrap();
        fs::write(&file2, "content 2").unwrap();

        assert_ne!(FileHasher::hash(&file1).unwrap(), FileHasher::hash(&file2).unwrap());
    }

    #[test]
    fn test_streaming_matches_in_memory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("large.bin");
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&file, &content).unwrap();

        assert_eq!(FileHasher::hash(&file).unwrap(), ContentDigest::of_bytes(&content));
    }

    #[test]
    fn test_known_digest_rendering() {
        let digest = ContentDigest::of_bytes(b"test");
        assert_eq!(
            digest.as_str(),
            "sha256:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
        assert_eq!(digest.short(), "9f86d081884c");
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(FileHasher::hash(&tmp.path().join("nope")).is_err());
    }
}
