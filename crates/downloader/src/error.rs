use std::{io, path::PathBuf};

use reel_extractor::http::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("stream \"{requested}\" is not available, choose one of: {}", available.join(", "))]
    QualityNotAvailable {
        requested: String,
        available: Vec<String>,
    },
    #[error("no streams available")]
    NoStreams,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("ffmpeg not found at {0}")]
    ToolNotFound(String),
    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("nothing to merge")]
    NoInputs,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Network(#[from] TransportError),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("merging into {} failed, parts kept for recovery: {}", output.display(), display_paths(parts))]
    Mux {
        output: PathBuf,
        parts: Vec<PathBuf>,
        #[source]
        source: MergeError,
    },

    #[error("stream {0} has no usable parts")]
    InvalidStream(String),

    #[error("download task failed: {0}")]
    TaskFailed(String),
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_error_lists_available() {
        let err = SelectionError::QualityNotAvailable {
            requested: "4k".into(),
            available: vec!["1080p".into(), "720p".into()],
        };
        assert_eq!(
            err.to_string(),
            "stream \"4k\" is not available, choose one of: 1080p, 720p"
        );
    }

    #[test]
    fn test_mux_error_lists_parts() {
        let err = DownloadError::Mux {
            output: PathBuf::from("out/clip.mp4"),
            parts: vec![PathBuf::from("out/clip[0].mp4"), PathBuf::from("out/clip[1].m4a")],
            source: MergeError::NoInputs,
        };
        let message = err.to_string();
        assert!(message.contains("clip[0].mp4"));
        assert!(message.contains("clip[1].m4a"));
    }
}
