//! Playlist entry selection and ordered, bounded fan-out.

use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{extractor::ExtractorError, media::Data, pool::TaskPool};

/// Which entries of a playlist to resolve.
///
/// An explicit item list (`"1-3, 5, 7-8"`) takes precedence over the
/// `start`/`end` bounds. All indices are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSelection {
    pub items: Option<String>,
    /// First entry to take, `0` meaning from the beginning.
    pub start: usize,
    /// Last entry to take, `0` meaning up to the end.
    pub end: usize,
}

impl PlaylistSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn items(items: impl Into<String>) -> Self {
        Self {
            items: Some(items.into()),
            ..Default::default()
        }
    }

    pub fn range(start: usize, end: usize) -> Self {
        Self {
            items: None,
            start,
            end,
        }
    }

    /// 1-based indices to resolve out of `length` entries.
    ///
    /// The item-list form is taken literally: indices come out in the order
    /// written, duplicates are kept, a reversed range such as `5-1` yields
    /// nothing and a number that does not parse counts as `0`. Indices past
    /// `length` are returned as is and ignored by [`resolve`].
    pub fn need_download_list(&self, length: usize) -> Vec<usize> {
        self.ranges(length)
            .into_iter()
            .flat_map(|(start, end)| start..=end)
            .collect()
    }

    /// Whether the 1-based `position` of a `length` entry playlist is
    /// selected. Bounds are compared, never expanded, so huge ranges cost
    /// nothing.
    pub fn selects(&self, position: usize, length: usize) -> bool {
        self.ranges(length)
            .iter()
            .any(|&(start, end)| start <= position && position <= end)
    }

    /// Inclusive `(start, end)` bounds in the order written.
    fn ranges(&self, length: usize) -> Vec<(usize, usize)> {
        if let Some(items) = self.items.as_deref().filter(|s| !s.trim().is_empty()) {
            return items
                .split(',')
                .map(|token| {
                    let mut bounds = token.split('-');
                    let start = parse_index(bounds.next());
                    let end = match bounds.next() {
                        Some(end) => parse_index(Some(end)),
                        None => start,
                    };
                    (start, end)
                })
                .collect();
        }

        let start = self.start.max(1);
        let end = match self.end {
            0 => length,
            end => end,
        };
        vec![(start, end.max(start))]
    }
}

fn parse_index(value: Option<&str>) -> usize {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Something a playlist is made of: an episode, a page, a url.
pub trait PlaylistEntry {
    /// Url reported on the failed item when the entry cannot be resolved.
    fn source_url(&self) -> &str;
}

impl PlaylistEntry for String {
    fn source_url(&self) -> &str {
        self
    }
}

/// Resolves the selected `entries` into one [`Data`] each.
///
/// Entries are visited in collection order and kept when their 1-based
/// position is in the selection. Extraction runs on at most `concurrency`
/// tasks (`0` for no limit). The output holds one item per kept entry, in
/// entry order, whatever order the tasks finish in. A failed or panicked
/// extraction becomes a [`Data::failed`] item; this function itself never
/// fails.
pub async fn resolve<E, F, Fut>(
    entries: Vec<E>,
    selection: &PlaylistSelection,
    concurrency: usize,
    extract: F,
) -> Vec<Data>
where
    E: PlaylistEntry,
    F: Fn(E) -> Fut,
    Fut: Future<Output = Result<Data, ExtractorError>> + Send + 'static,
{
    fan_out(entries, selection, concurrency, extract)
        .await
        .into_iter()
        .map(|(url, outcome)| match outcome {
            Some(Ok(data)) => data,
            Some(Err(e)) => Data::failed(url, e),
            None => Data::failed(url.clone(), ExtractorError::TaskFailed(url)),
        })
        .collect()
}

/// Like [`resolve`], for extractions that may yield several items per entry.
///
/// Items are flattened in entry order; a failed entry contributes a single
/// failed item.
pub async fn resolve_many<E, F, Fut>(
    entries: Vec<E>,
    selection: &PlaylistSelection,
    concurrency: usize,
    extract: F,
) -> Vec<Data>
where
    E: PlaylistEntry,
    F: Fn(E) -> Fut,
    Fut: Future<Output = Result<Vec<Data>, ExtractorError>> + Send + 'static,
{
    fan_out(entries, selection, concurrency, extract)
        .await
        .into_iter()
        .flat_map(|(url, outcome)| match outcome {
            Some(Ok(data)) => data,
            Some(Err(e)) => vec![Data::failed(url, e)],
            None => vec![Data::failed(url.clone(), ExtractorError::TaskFailed(url))],
        })
        .collect()
}

/// Runs `task` for every selected entry and returns `(source url, result)`
/// per selected entry in entry order. `None` marks a task that panicked.
async fn fan_out<E, R, F, Fut>(
    entries: Vec<E>,
    selection: &PlaylistSelection,
    concurrency: usize,
    task: F,
) -> Vec<(String, Option<R>)>
where
    E: PlaylistEntry,
    R: Send + 'static,
    F: Fn(E) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let ranges = selection.ranges(entries.len());
    let pool = TaskPool::new(concurrency);
    let mut tasks = JoinSet::new();
    let mut slots: Vec<(String, Option<R>)> = Vec::new();

    for (position, entry) in (1..).zip(entries) {
        if !ranges
            .iter()
            .any(|&(start, end)| start <= position && position <= end)
        {
            continue;
        }
        let slot = slots.len();
        slots.push((entry.source_url().to_string(), None));

        let permit = pool.acquire().await;
        let work = task(entry);
        tasks.spawn(async move {
            let _permit = permit;
            (slot, work.await)
        });
    }
    debug!(
        selected = slots.len(),
        concurrency = pool.capacity(),
        "Playlist tasks launched"
    );

    pool.wait().await;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((slot, result)) => {
                if let Some(entry) = slots.get_mut(slot) {
                    entry.1 = Some(result);
                }
            }
            Err(e) => warn!(error = %e, "Playlist task did not complete"),
        }
    }
    slots
}
