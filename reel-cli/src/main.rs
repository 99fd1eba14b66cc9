mod cli;
mod config;
mod error;
mod output;

use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use reel_downloader::{DownloadConfig, Downloader, FfmpegMerger, StreamSelector};
use reel_extractor::{
    ExtractOptions, PlaylistSelection,
    extractor::default_registry,
    http::{HttpConfig, HttpTransport, Transport, proxy_url},
    playlist,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{cli::Args, config::AppConfig, error::AppError, output::OutputManager};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {e:#}");
            #[cfg(feature = "colored-output")]
            {
                eprintln!("{} {e:#}", "Error:".red().bold());
            }
            #[cfg(not(feature = "colored-output"))]
            {
                eprintln!("Error: {e:#}");
            }
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when at least one item failed.
async fn run(args: Args) -> anyhow::Result<bool> {
    init_logging(args.verbose, args.quiet);

    let config = AppConfig::load(args.config.as_deref())?;
    debug!(?config, "Configuration loaded");

    let urls = collect_urls(&args)?;
    if urls.is_empty() {
        return Err(AppError::InvalidInput("no url given, pass one or use --file".into()).into());
    }

    let threads = args.threads.unwrap_or(config.threads);
    let cookie = match args.cookie.as_deref().or(config.cookie.as_deref()) {
        Some(value) => Some(read_cookie(value)?),
        None => None,
    };

    let mut http = HttpConfig {
        cookie: cookie.clone(),
        referer: args.referer.clone(),
        proxy: proxy(&args, &config),
        ..HttpConfig::default()
    };
    http.read_timeout = Duration::from_secs(args.timeout.unwrap_or(config.timeout_secs));
    http.retry = http.retry.with_max_retries(args.retry.unwrap_or(config.retry));
    if let Some(user_agent) = &config.user_agent {
        http.user_agent = user_agent.clone();
    }
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(http)?);

    let selection = PlaylistSelection {
        items: args.items.clone(),
        start: args.start,
        end: args.end,
    };
    if selection != PlaylistSelection::all() && !args.playlist && args.url_file.is_none() {
        warn!("Playlist selection has no effect without --playlist or --file");
    }
    let options = Arc::new(ExtractOptions {
        playlist: args.playlist,
        selection: selection.clone(),
        thread_number: threads,
        cookie,
        quality: args.format.clone(),
        episode_title_only: args.episode_title_only,
    });

    // Lines of a url file are a playlist of their own.
    let input_selection = if args.url_file.is_some() {
        selection
    } else {
        PlaylistSelection::all()
    };

    let registry = Arc::new(default_registry(transport.clone()));
    let items = playlist::resolve_many(urls, &input_selection, threads, |url: String| {
        let registry = registry.clone();
        let options = options.clone();
        async move { registry.extract(&url, &options).await }
    })
    .await;
    info!(count = items.len(), "Extraction finished");

    let output = OutputManager::new(std::io::stdout().is_terminal());

    if args.json {
        println!("{}", output.format_json(&items)?);
        return Ok(items.iter().all(|d| !d.is_failed()));
    }

    let selector = StreamSelector::new(args.format.clone());
    let downloader = (!args.info_only).then(|| {
        let merger = args
            .ffmpeg
            .clone()
            .or_else(|| config.ffmpeg.clone())
            .map(FfmpegMerger::new)
            .unwrap_or_else(FfmpegMerger::locate);
        Downloader::new(
            transport.clone(),
            Arc::new(merger),
            DownloadConfig {
                output_dir: args.output_path.clone().unwrap_or(config.output_path.clone()),
                output_name: args.output_name.clone(),
                stream: args.format.clone(),
                thread_number: threads,
                caption: args.caption || config.caption,
                file_name_length: args.file_name_length.unwrap_or(config.file_name_length),
                show_progress: !args.quiet,
                chunk_size: args
                    .chunk_size
                    .unwrap_or(config.chunk_size_mb)
                    .saturating_mul(1024 * 1024),
            },
        )
    });

    let mut all_ok = true;
    for data in &items {
        if let Some(err) = data.error() {
            eprintln!("{}", output.format_error(&data.url, err));
            all_ok = false;
            continue;
        }

        let Some(downloader) = &downloader else {
            print!("{}", output.format_info(data));
            continue;
        };

        match selector.select(data) {
            Ok(stream) => print!("{}", output.format_selected(data, stream)),
            Err(e) => {
                eprintln!("{}", output.format_error(&data.url, &e));
                all_ok = false;
                continue;
            }
        }

        match downloader.download(data).await {
            Ok(outcome) => print!("{}", output.format_outcome(&outcome)),
            Err(e) => {
                error!(url = %data.url, error = %e, "Download failed");
                eprintln!("{}", output.format_error(&data.url, &e));
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

/// Positional urls followed by the non-blank lines of `--file`.
fn collect_urls(args: &Args) -> anyhow::Result<Vec<String>> {
    let mut urls = args.urls.clone();
    if let Some(path) = &args.url_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read url file {}", path.display()))?;
        urls.extend(parse_url_lines(&content));
    }
    Ok(urls)
}

fn parse_url_lines(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
}

/// A cookie value naming an existing file is replaced by the file content.
fn read_cookie(value: &str) -> anyhow::Result<String> {
    let path = PathBuf::from(value);
    if !is_file(&path) {
        return Ok(value.to_owned());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
    Ok(content.trim().to_owned())
}

/// `--socks5-proxy` wins over `--http-proxy`, and both over the config file.
fn proxy(args: &Args, config: &AppConfig) -> Option<String> {
    args.socks5_proxy
        .as_deref()
        .map(|addr| proxy_url("socks5", addr))
        .or_else(|| args.http_proxy.as_deref().map(|addr| proxy_url("http", addr)))
        .or_else(|| config.proxy.clone())
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .init();
}
