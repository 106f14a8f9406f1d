use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// A config file read into memory and validated as UTF-8
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Path the content was read from
    pub path: PathBuf,
    /// File content
    pub content: String,
    /// BLAKE3 hash of the content (hex-encoded)
    pub checksum: String,
}

impl ConfigFile {
    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }
}

/// Hex-encoded BLAKE3 hash of `bytes`
pub fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Read a config file from disk with UTF-8 validation
///
/// # Errors
/// * [`ConfigError::NotFound`] - nothing at `path`
/// * [`ConfigError::Utf8`] - content is not UTF-8
/// * [`ConfigError::Io`] - any other read failure
pub fn read_config_file<P: AsRef<Path>>(path: P) -> Result<ConfigFile> {
    let path = path.as_ref();

    let bytes = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ConfigError::not_found(path.display().to_string()),
        _ => ConfigError::Io(err),
    })?;

    let content = String::from_utf8(bytes).map_err(|_| ConfigError::Utf8 {
        path: path.display().to_string(),
    })?;

    let checksum = checksum(content.as_bytes());
    tracing::debug!(path = %path.display(), len = content.len(), %checksum, "read config file");

    Ok(ConfigFile {
        path: path.to_path_buf(),
        content,
        checksum,
    })
}

/// Write `bytes` to `path` and return their checksum
pub fn write_config_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<String> {
    let path = path.as_ref();
    fs::write(path, bytes)?;
    tracing::debug!(path = %path.display(), len = bytes.len(), "wrote config file");
    Ok(checksum(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_read_config_file_valid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("NuGet.Config");
        let content = "<packageSources>\n</packageSources>\n";
        fs::write(&file_path, content).unwrap();

        let file = read_config_file(&file_path).unwrap();

        assert_eq!(file.as_str(), content);
        assert_eq!(file.bytes(), content.as_bytes());
        assert_eq!(file.path, file_path);
        assert_eq!(file.checksum.len(), 64);
        assert!(file.checksum.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(file.checksum, checksum(content.as_bytes()));
    }

    #[test]
    fn test_read_config_file_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("NuGet.Config");
        fs::write(&file_path, [0xFF, 0xFE, 0xFD]).unwrap();

        match read_config_file(&file_path) {
            Err(ConfigError::Utf8 { path }) => assert_eq!(path, file_path.display().to_string()),
            other => panic!("Expected ConfigError::Utf8, got {other:?}"),
        }
    }

    #[test]
    fn test_read_config_file_not_found() {
        let err = read_config_file("/nonexistent/path/NuGet.Config").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_write_config_file_returns_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("out.config");

        let written = write_config_file(&file_path, b"<packageSources/>").unwrap();

        assert_eq!(written, checksum(b"<packageSources/>"));
        assert_eq!(fs::read(&file_path).unwrap(), b"<packageSources/>");
    }
}
