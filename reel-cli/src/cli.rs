use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "reel",
    version,
    about = "Extract and download videos, audio and images from web pages"
)]
pub struct Args {
    /// Page urls to extract
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Read urls from a file, one per line
    #[arg(short = 'F', long = "file", value_name = "PATH")]
    pub url_file: Option<PathBuf>,

    /// Only print the extracted information, download nothing
    #[arg(short = 'C', long = "info-only")]
    pub info_only: bool,

    /// Print the extracted information as JSON
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Stream id to download (default: the biggest one)
    #[arg(short = 'f', long = "format", value_name = "ID")]
    pub format: Option<String>,

    /// Download every entry of a playlist page
    #[arg(short = 'l', long)]
    pub playlist: bool,

    /// Playlist or url-file entries to take, e.g. "1-3, 5, 7-8"
    #[arg(short = 'p', long = "playlist-items", value_name = "ITEMS")]
    pub items: Option<String>,

    /// First playlist entry to take
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Last playlist entry to take (0 = last)
    #[arg(long, default_value_t = 0)]
    pub end: usize,

    /// Use only the episode title as file name
    #[arg(long)]
    pub episode_title_only: bool,

    /// Concurrent downloads and extractions
    #[arg(short = 'n', long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// Cookie string, or a path to a file holding it
    #[arg(short = 'c', long, env = "REEL_COOKIE")]
    pub cookie: Option<String>,

    /// Referer sent with every request
    #[arg(short = 'r', long = "refer", value_name = "URL")]
    pub referer: Option<String>,

    /// Output directory
    #[arg(short = 'o', long = "output-path", value_name = "DIR")]
    pub output_path: Option<PathBuf>,

    /// Output file name, without extension
    #[arg(short = 'O', long = "output-name", value_name = "NAME")]
    pub output_name: Option<String>,

    /// Maximum file name length
    #[arg(long, value_name = "N")]
    pub file_name_length: Option<usize>,

    /// Download captions too
    #[arg(long)]
    pub caption: bool,

    /// Retries for failed requests
    #[arg(long, value_name = "N")]
    pub retry: Option<u32>,

    /// Network timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// HTTP proxy, e.g. "127.0.0.1:8080"
    #[arg(short = 'x', long = "http-proxy", value_name = "ADDR")]
    pub http_proxy: Option<String>,

    /// SOCKS5 proxy, e.g. "127.0.0.1:1080"; wins over --http-proxy
    #[arg(short = 's', long = "socks5-proxy", value_name = "ADDR")]
    pub socks5_proxy: Option<String>,

    /// Fetch single files in ranged requests of this many MiB (0 = one request)
    #[arg(long = "chunk-size", visible_alias = "cs", value_name = "MB")]
    pub chunk_size: Option<u64>,

    /// Path to the ffmpeg binary
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
