//! Download side of reel: stream selection, part transfer and merging.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod files;
pub mod merge;
pub mod selector;

pub use config::DownloadConfig;
pub use dispatcher::{DownloadOutcome, Downloader};
pub use error::{DownloadError, MergeError, Result, SelectionError};
pub use merge::{FfmpegMerger, Merger};
pub use selector::StreamSelector;
