//! File helpers for the download path.

use std::path::{Path, PathBuf};

use crate::error::{DownloadError, Result};

/// Suffix of a file that is still being written.
pub const TEMP_SUFFIX: &str = ".download";

/// Ensure the output directory exists, creating it if necessary.
pub async fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| DownloadError::io(path, e))
}

/// Length of the file at `path`, or `None` when it does not exist.
pub async fn existing_len(path: &Path) -> Result<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DownloadError::io(path, e)),
    }
}

/// `<dir>/<name>.<ext>`
pub fn output_path(dir: &Path, name: &str, ext: &str) -> PathBuf {
    if ext.is_empty() {
        dir.join(name)
    } else {
        dir.join(format!("{name}.{ext}"))
    }
}

/// Sibling path used while `path` is downloading.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_output_dir_creates_nested_directories() {
        let temp = TempDir::new().unwrap();
        let nested_dir = temp.path().join("level1").join("level2");

        assert!(!nested_dir.exists());
        ensure_output_dir(&nested_dir).await.unwrap();
        assert!(nested_dir.exists());
        ensure_output_dir(&nested_dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_existing_len() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.bin");
        assert_eq!(existing_len(&file).await.unwrap(), None);
        tokio::fs::write(&file, b"12345").await.unwrap();
        assert_eq!(existing_len(&file).await.unwrap(), Some(5));
        assert_eq!(existing_len(temp.path()).await.unwrap(), None);
    }

    #[test]
    fn test_paths() {
        let dir = Path::new("out");
        assert_eq!(output_path(dir, "clip[0]", "ts"), PathBuf::from("out/clip[0].ts"));
        assert_eq!(output_path(dir, "clip", ""), PathBuf::from("out/clip"));
        assert_eq!(
            temp_path(Path::new("out/clip.mp4")),
            PathBuf::from("out/clip.mp4.download")
        );
    }
}
