use std::sync::Arc;

use async_trait::async_trait;
use m3u8_rs::Playlist;
use tracing::debug;
use url::Url;

use super::{
    ExtractOptions, Extractor, ExtractorError,
    hls::{self, PlaylistTrack},
    utils,
};
use crate::{
    http::Transport,
    media::{Data, MediaType, Part, Stream},
    playlist,
};

pub const SITE: &str = "Universal";

/// Fallback extractor for direct media links.
///
/// The url itself is the only part; name and extension come from the path,
/// the media type from the `Content-Type` header. `.m3u8` and `.m3u` links
/// are expanded into their segments, or with `playlist` set, a media
/// playlist yields one item per selected entry.
pub struct UniversalExtractor {
    transport: Arc<dyn Transport>,
}

impl UniversalExtractor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Extractor for UniversalExtractor {
    fn name(&self) -> &'static str {
        SITE
    }

    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<Data>, ExtractorError> {
        let parsed = Url::parse(url).map_err(|_| ExtractorError::InvalidUrl(url.to_string()))?;

        if matches!(utils::url_ext(&parsed).as_deref(), Some("m3u8" | "m3u")) {
            let (title, _) = utils::name_and_ext(&parsed, "");
            let list = hls::fetch_playlist(self.transport.as_ref(), &parsed, options).await?;
            if let Playlist::MediaPlaylist(media) = &list
                && options.playlist
            {
                let tracks = hls::media_tracks(media, &parsed, &title, options.episode_title_only)?;
                debug!(url, entries = tracks.len(), "Expanding media playlist");
                let transport = self.transport.clone();
                let items = playlist::resolve(
                    tracks,
                    &options.selection,
                    options.thread_number,
                    move |track: PlaylistTrack| {
                        let transport = transport.clone();
                        async move {
                            extract_direct(transport.as_ref(), &track.url, Some(track.title)).await
                        }
                    },
                )
                .await;
                return Ok(items);
            }
            let data =
                hls::playlist_data(self.transport.as_ref(), &parsed, &title, list, options).await?;
            return Ok(vec![data]);
        }

        Ok(vec![extract_direct(self.transport.as_ref(), url, None).await?])
    }
}

/// A single file link: size and type from the server, name from the path
/// unless `title` is given.
async fn extract_direct(
    transport: &dyn Transport,
    url: &str,
    title: Option<String>,
) -> Result<Data, ExtractorError> {
    let parsed = Url::parse(url).map_err(|_| ExtractorError::InvalidUrl(url.to_string()))?;
    let content_type = transport.content_type(url, None).await?;
    let (name, ext) = utils::name_and_ext(&parsed, &content_type);
    if ext.is_empty() {
        return Err(ExtractorError::parse_failure(
            url,
            "cannot determine the file extension",
        ));
    }
    let size = transport.size_of(url, None).await?;
    debug!(url, size, content_type = %content_type, "Direct media link");

    let stream = Stream::new("default")
        .with_part(Part::new(url, size, ext))
        .with_size(size);
    Ok(Data::new(
        SITE,
        title.unwrap_or(name),
        MediaType::from_mime(&content_type),
        url,
    )
    .with_stream(stream))
}
