//! Picks the stream of a [`Data`] to download.

use reel_extractor::media::{Data, Stream};
use tracing::debug;

use crate::error::SelectionError;

/// Selects a stream by id, or the biggest one when no id is requested.
#[derive(Debug, Clone, Default)]
pub struct StreamSelector {
    requested: Option<String>,
}

impl StreamSelector {
    /// An empty `requested` id behaves like no request at all.
    pub fn new(requested: Option<String>) -> Self {
        Self {
            requested: requested.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// Returns the requested stream, or the first of
    /// [`Data::sorted_streams`] when nothing was requested.
    ///
    /// Never touches the network, so a bad request fails before any transfer.
    pub fn select<'a>(&self, data: &'a Data) -> Result<&'a Stream, SelectionError> {
        if data.streams().is_empty() {
            return Err(SelectionError::NoStreams);
        }

        match self.requested.as_deref() {
            Some(id) => data
                .stream(id)
                .ok_or_else(|| SelectionError::QualityNotAvailable {
                    requested: id.to_string(),
                    available: data.stream_ids(),
                }),
            None => {
                let best = data
                    .sorted_streams()
                    .into_iter()
                    .next()
                    .ok_or(SelectionError::NoStreams)?;
                debug!(stream = %best.id, size = best.effective_size(), "Selected best stream");
                Ok(best)
            }
        }
    }
}
