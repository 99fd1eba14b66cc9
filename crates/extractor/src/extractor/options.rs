use crate::playlist::PlaylistSelection;

/// Per-call extraction settings.
///
/// Passed explicitly to every [`Extractor::extract`](super::Extractor::extract)
/// call; extractors read nothing from process-wide state.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Expand playlist pages into every selected entry instead of only the
    /// entry the url points at.
    pub playlist: bool,
    /// Which playlist entries to resolve.
    pub selection: PlaylistSelection,
    /// Concurrency bound for playlist fan-out. `0` means unbounded.
    pub thread_number: usize,
    /// Raw cookie string for sites that need a session.
    pub cookie: Option<String>,
    /// Preferred stream id, for sites that only expose one quality per request.
    pub quality: Option<String>,
    /// Use the episode title alone instead of `playlist title + episode`.
    pub episode_title_only: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            playlist: false,
            selection: PlaylistSelection::default(),
            thread_number: 10,
            cookie: None,
            quality: None,
            episode_title_only: false,
        }
    }
}
