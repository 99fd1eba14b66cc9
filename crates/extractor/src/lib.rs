//! Extraction side of reel.
//!
//! Turns a page URL into one or more [`media::Data`] items through a domain
//! keyed [`extractor::ExtractorRegistry`], and provides the bounded fan-out
//! used to resolve playlists without scrambling their order.

pub mod extractor;
pub mod http;
pub mod media;
pub mod playlist;
pub mod pool;

pub use extractor::{ExtractOptions, Extractor, ExtractorError, ExtractorRegistry};
pub use media::{Data, MediaType, Part, Stream};
pub use playlist::PlaylistSelection;
pub use pool::TaskPool;
