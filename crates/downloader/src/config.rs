use std::path::PathBuf;

/// Configurable options for the downloader
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory the output files are written to.
    pub output_dir: PathBuf,
    /// Overrides the item title as the output file name.
    pub output_name: Option<String>,
    /// Stream id to download; the biggest stream when unset.
    pub stream: Option<String>,
    /// Maximum number of parts downloaded at once. `0` means unbounded.
    pub thread_number: usize,
    /// Also download the caption when the item has one.
    pub caption: bool,
    /// Maximum file name length in characters. `0` disables the limit.
    pub file_name_length: usize,
    /// Fetch single files in ranged requests of this many bytes. `0`
    /// fetches the rest of the file in one request.
    pub chunk_size: u64,
    pub show_progress: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_name: None,
            stream: None,
            thread_number: 10,
            caption: false,
            file_name_length: 255,
            chunk_size: 0,
            show_progress: true,
        }
    }
}
