//! Content fingerprints for idempotent writes

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Lowercase hex SHA-256 of `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fingerprint of the file at `path`, `None` when it does not exist
pub fn file_fingerprint(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(fingerprint(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fingerprint(b"abc").len(), 64);
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(file_fingerprint(&dir.path().join("none")).unwrap(), None);

        let path = dir.path().join("some");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(file_fingerprint(&path).unwrap(), Some(fingerprint(b"abc")));
    }
}
