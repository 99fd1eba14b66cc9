//! Turns a selected stream into files on disk.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reel_extractor::{
    http::{Transport, TransportError},
    media::{Data, MediaType, Part, Stream, sanitize_title},
    pool::TaskPool,
};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, task::JoinSet};
use tracing::{debug, info, warn};

use crate::{
    config::DownloadConfig,
    error::{DownloadError, Result},
    files::{ensure_output_dir, existing_len, output_path, temp_path},
    merge::Merger,
    selector::StreamSelector,
};

/// What a download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The output was already complete on disk.
    Skipped(PathBuf),
    /// A single file was written.
    Downloaded(PathBuf),
    /// Parts were fetched and joined into one file.
    Merged(PathBuf),
    /// Parts were fetched and kept as separate files.
    Parts(Vec<PathBuf>),
}

impl DownloadOutcome {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Self::Skipped(p) | Self::Downloaded(p) | Self::Merged(p) => vec![p.as_path()],
            Self::Parts(parts) => parts.iter().map(PathBuf::as_path).collect(),
        }
    }
}

enum PartOutcome {
    Skipped,
    Downloaded,
}

/// Downloads the selected stream of a [`Data`].
///
/// Single-part streams are written straight to `<title>.<ext>`. Multi-part
/// streams are fetched concurrently as `<title>[<i>].<ext>` and, for video,
/// merged into `<title>.<stream ext>` (muxed when the parts are separate
/// tracks, concatenated otherwise).
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
    merger: Arc<dyn Merger>,
    config: Arc<DownloadConfig>,
}

impl Downloader {
    pub fn new(
        transport: Arc<dyn Transport>,
        merger: Arc<dyn Merger>,
        config: DownloadConfig,
    ) -> Self {
        Self {
            transport,
            merger,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub async fn download(&self, data: &Data) -> Result<DownloadOutcome> {
        if let Some(err) = data.error() {
            return Err(DownloadError::Extraction {
                url: data.url.clone(),
                reason: err.to_string(),
            });
        }

        let stream = StreamSelector::new(self.config.stream.clone()).select(data)?;
        if stream.parts.is_empty() || !stream.parts.iter().all(Part::is_usable) {
            return Err(DownloadError::InvalidStream(stream.id.clone()));
        }

        let title = sanitize_title(
            self.config.output_name.as_deref().unwrap_or(&data.title),
            self.config.file_name_length,
        );
        ensure_output_dir(&self.config.output_dir).await?;

        if self.config.caption
            && let Some(caption) = &data.caption
        {
            self.download_caption(caption, &title, &data.url).await?;
        }

        info!(
            url = %data.url,
            stream = %stream.id,
            parts = stream.parts.len(),
            "Downloading"
        );
        match stream.parts.as_slice() {
            [part] => self.download_single(part, &title, &data.url).await,
            _ => self.download_parts(data, stream, &title).await,
        }
    }

    async fn download_single(
        &self,
        part: &Part,
        title: &str,
        referer: &str,
    ) -> Result<DownloadOutcome> {
        let path = output_path(&self.config.output_dir, title, &part.ext);
        let bar = self.progress_bar(part.size, title);
        let outcome = self.save_part(part, referer, &path, &bar).await;
        bar.finish_and_clear();

        Ok(match outcome? {
            PartOutcome::Skipped => DownloadOutcome::Skipped(path),
            PartOutcome::Downloaded => DownloadOutcome::Downloaded(path),
        })
    }

    async fn download_parts(
        &self,
        data: &Data,
        stream: &Stream,
        title: &str,
    ) -> Result<DownloadOutcome> {
        let merged_ext = if stream.ext.is_empty() {
            stream.parts[0].ext.as_str()
        } else {
            stream.ext.as_str()
        };
        let merged = output_path(&self.config.output_dir, title, merged_ext);
        if data.media_type == MediaType::Video && existing_len(&merged).await?.is_some() {
            info!(path = %merged.display(), "Merged file already exists, skipping");
            return Ok(DownloadOutcome::Skipped(merged));
        }

        let bar = self.progress_bar(stream.effective_size(), title);
        let pool = TaskPool::new(self.config.thread_number);
        let mut tasks = JoinSet::new();
        let mut part_paths = Vec::with_capacity(stream.parts.len());

        for (index, part) in stream.parts.iter().enumerate() {
            let path = output_path(
                &self.config.output_dir,
                &format!("{title}[{index}]"),
                &part.ext,
            );
            part_paths.push(path.clone());

            let permit = pool.acquire().await;
            let this = self.clone();
            let part = part.clone();
            let referer = data.url.clone();
            let bar = bar.clone();
            tasks.spawn(async move {
                let _permit = permit;
                this.save_part(&part, &referer, &path, &bar).await
            });
        }

        pool.wait().await;
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let err = match joined {
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => e,
                Err(e) => DownloadError::TaskFailed(e.to_string()),
            };
            warn!(error = %err, "Part download failed");
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
        bar.finish_and_clear();
        if let Some(err) = first_error {
            return Err(err);
        }

        if data.media_type != MediaType::Video {
            debug!(parts = part_paths.len(), "Keeping parts of non-video item");
            return Ok(DownloadOutcome::Parts(part_paths));
        }

        let merge = if stream.need_mux {
            self.merger.mux(&part_paths, &merged).await
        } else {
            self.merger.concat(&part_paths, &merged).await
        };
        if let Err(source) = merge {
            return Err(DownloadError::Mux {
                output: merged,
                parts: part_paths,
                source,
            });
        }

        for part in &part_paths {
            if let Err(e) = tokio::fs::remove_file(part).await {
                warn!(path = %part.display(), error = %e, "Failed to remove merged part");
            }
        }
        info!(path = %merged.display(), "Merged parts");
        Ok(DownloadOutcome::Merged(merged))
    }

    async fn download_caption(&self, caption: &Part, title: &str, referer: &str) -> Result<()> {
        let path = output_path(&self.config.output_dir, title, &caption.ext);
        self.save_part(caption, referer, &path, &ProgressBar::hidden())
            .await?;
        info!(path = %path.display(), "Caption saved");
        Ok(())
    }

    /// Writes `part` to `path`.
    ///
    /// A file already at `path` with the expected size counts as done. The
    /// body goes to a `.download` sibling first, which is resumed if present
    /// and renamed into place once complete.
    async fn save_part(
        &self,
        part: &Part,
        referer: &str,
        path: &Path,
        bar: &ProgressBar,
    ) -> Result<PartOutcome> {
        let size = match part.size {
            0 => self.transport.size_of(&part.url, Some(referer)).await?,
            size => size,
        };

        match existing_len(path).await? {
            Some(len) if len == size => {
                debug!(path = %path.display(), size, "File exists with the same size, skipping");
                bar.inc(size);
                return Ok(PartOutcome::Skipped);
            }
            Some(len) => warn!(
                path = %path.display(),
                existing = len,
                expected = size,
                "File exists with a different size, downloading again"
            ),
            None => {}
        }

        let temp = temp_path(path);
        let policy = self.transport.retry_policy();
        let mut attempt = 0;
        loop {
            match self.transfer(part, referer, &temp, size, bar).await {
                Ok(()) => break,
                Err(DownloadError::Network(e))
                    if e.is_mid_body() && attempt < policy.max_retries =>
                {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        url = %part.url,
                        attempt = attempt + 1,
                        max = policy.max_retries,
                        error = %e,
                        "Transfer interrupted, resuming"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tokio::fs::rename(&temp, path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        Ok(PartOutcome::Downloaded)
    }

    /// One attempt at appending the rest of `part` to `temp`.
    ///
    /// With a chunk size and a known length the body is requested in
    /// consecutive bounded ranges; otherwise in a single request.
    async fn transfer(
        &self,
        part: &Part,
        referer: &str,
        temp: &Path,
        size: u64,
        bar: &ProgressBar,
    ) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(temp)
            .await
            .map_err(|e| DownloadError::io(temp, e))?;
        let mut written = file
            .metadata()
            .await
            .map_err(|e| DownloadError::io(temp, e))?
            .len();

        if size > 0 && written > size {
            file.set_len(0).await.map_err(|e| DownloadError::io(temp, e))?;
            written = 0;
        }
        if written > 0 {
            debug!(url = %part.url, offset = written, "Resuming partial download");
        }
        bar.inc(written);

        let chunk_size = self.config.chunk_size;
        let result = loop {
            if size > 0 && written >= size {
                break Ok(());
            }
            let end = (chunk_size > 0 && size > 0)
                .then(|| written.saturating_add(chunk_size - 1).min(size - 1));
            match self
                .fetch_range(part, referer, &mut file, temp, &mut written, end, size, bar)
                .await
            {
                // A range running to the end of the resource finishes the file.
                Ok(None) => break Ok(()),
                Ok(Some(_)) => {}
                Err(e) => break Err(e),
            }
        };

        file.flush().await.map_err(|e| DownloadError::io(temp, e))?;
        if result.is_err() {
            bar.set_position(bar.position().saturating_sub(written));
        }
        result
    }

    /// Appends bytes `written..=end` of `part` to `file`, or everything from
    /// `written` on when `end` is `None`. Returns the honoured end.
    #[allow(clippy::too_many_arguments)]
    async fn fetch_range(
        &self,
        part: &Part,
        referer: &str,
        file: &mut tokio::fs::File,
        temp: &Path,
        written: &mut u64,
        end: Option<u64>,
        size: u64,
        bar: &ProgressBar,
    ) -> Result<Option<u64>> {
        let mut opened = self
            .transport
            .open_stream(&part.url, Some(referer), *written, end)
            .await?;
        if opened.offset != *written {
            debug!(url = %part.url, "Range not honoured, restarting from zero");
            file.set_len(0).await.map_err(|e| DownloadError::io(temp, e))?;
            bar.set_position(bar.position().saturating_sub(*written));
            *written = 0;
        }

        let expected = match opened.end {
            Some(end) => end + 1,
            None if size > 0 => size,
            None => opened.total.unwrap_or(0),
        };

        while let Some(chunk) = opened.stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(temp, e))?;
            *written += chunk.len() as u64;
            bar.inc(chunk.len() as u64);
        }

        if expected > 0 && *written < expected {
            return Err(TransportError::Interrupted {
                url: part.url.clone(),
                received: *written,
                expected,
            }
            .into());
        }
        Ok(opened.end)
    }

    fn progress_bar(&self, len: u64, title: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        let style = ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} {eta}",
        )
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(title.to_string());
        bar
    }
}
