use futures::{StreamExt, TryStreamExt, stream};
use m3u8_rs::{MediaPlaylist, Playlist};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use url::Url;

use super::{ExtractOptions, ExtractorError, utils};
use crate::{
    http::Transport,
    media::{Data, MediaType, Part, Stream},
    playlist::PlaylistEntry,
};

pub const SITE: &str = "HLS";

/// One entry of a media playlist expanded into its own item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistTrack {
    pub url: String,
    pub title: String,
}

impl PlaylistEntry for PlaylistTrack {
    fn source_url(&self) -> &str {
        &self.url
    }
}

/// Turns an HLS playlist into a [`Data`].
///
/// A media playlist becomes a single `default` stream whose parts are the
/// segments. A master playlist yields one stream per variant, named after
/// its resolution (or bandwidth when no resolution is advertised).
pub async fn extract_hls(
    transport: &dyn Transport,
    m3u8_url: &Url,
    title: &str,
    options: &ExtractOptions,
) -> Result<Data, ExtractorError> {
    let playlist = fetch_playlist(transport, m3u8_url, options).await?;
    playlist_data(transport, m3u8_url, title, playlist, options).await
}

/// Builds the [`Data`] of an already fetched playlist.
///
/// When `options.quality` names one of the variants of a master playlist,
/// only that variant is fetched. Variants are fetched concurrently, at most
/// `options.thread_number` at a time.
pub async fn playlist_data(
    transport: &dyn Transport,
    m3u8_url: &Url,
    title: &str,
    playlist: Playlist,
    options: &ExtractOptions,
) -> Result<Data, ExtractorError> {
    let mut data = Data::new(SITE, title, MediaType::Video, m3u8_url.as_str());

    match playlist {
        Playlist::MediaPlaylist(media) => {
            let stream = segments_stream("default", &media, m3u8_url)?;
            data.insert_stream(stream);
        }
        Playlist::MasterPlaylist(master) => {
            let mut used = FxHashSet::default();
            let mut variants = Vec::new();
            for variant in master.variants.iter().filter(|v| !v.is_i_frame) {
                let variant_url = m3u8_url.join(&variant.uri).map_err(|e| {
                    ExtractorError::playlist(m3u8_url.as_str(), format!("bad variant uri: {e}"))
                })?;
                let kbps = variant.bandwidth / 1000;
                let id = variant_id(
                    &mut used,
                    variant.resolution.as_ref().map(|r| r.height),
                    kbps,
                );
                variants.push((id, variant_url, kbps));
            }

            let wanted = options
                .quality
                .as_deref()
                .filter(|quality| variants.iter().any(|(id, ..)| id == quality));
            if let Some(quality) = wanted {
                debug!(quality, "Fetching the requested HLS variant only");
                variants.retain(|(id, ..)| id == quality);
            }

            let concurrency = match options.thread_number {
                0 => variants.len(),
                n => n,
            }
            .max(1);
            let streams: Vec<Stream> = stream::iter(variants)
                .map(move |(id, variant_url, kbps)| async move {
                    debug!(variant = %variant_url, id = %id, "Resolving HLS variant");
                    let Playlist::MediaPlaylist(media) =
                        fetch_playlist(transport, &variant_url, options).await?
                    else {
                        return Err(ExtractorError::playlist(
                            variant_url.as_str(),
                            "nested master playlist",
                        ));
                    };
                    Ok(segments_stream(&id, &media, &variant_url)?
                        .with_quality(format!("{id} ({kbps} kbps)")))
                })
                .buffered(concurrency)
                .try_collect()
                .await?;
            for stream in streams {
                data.insert_stream(stream);
            }
        }
    }

    if data.streams().is_empty() {
        return Err(ExtractorError::playlist(
            m3u8_url.as_str(),
            "playlist has no playable variants",
        ));
    }
    Ok(data)
}

/// `720p`, or `720p-2800k` when another variant already took `720p`.
fn variant_id(used: &mut FxHashSet<String>, height: Option<u64>, kbps: u64) -> String {
    let base = match height {
        Some(height) => format!("{height}p"),
        None => format!("{kbps}k"),
    };
    let mut id = base.clone();
    if used.contains(&id) && height.is_some() {
        id = format!("{base}-{kbps}k");
    }
    let mut n = 2;
    while used.contains(&id) {
        id = format!("{base}-{n}");
        n += 1;
    }
    used.insert(id.clone());
    id
}

pub async fn fetch_playlist(
    transport: &dyn Transport,
    url: &Url,
    options: &ExtractOptions,
) -> Result<Playlist, ExtractorError> {
    let mut headers = FxHashMap::default();
    if let Some(cookie) = &options.cookie {
        headers.insert("Cookie".to_string(), cookie.clone());
    }
    let body = transport.fetch(url.as_str(), None, &headers).await?;
    m3u8_rs::parse_playlist_res(&body)
        .map_err(|e| ExtractorError::playlist(url.as_str(), e.to_string()))
}

/// The entries of a media playlist, each titled after its `#EXTINF` title
/// or, failing that, its file name.
///
/// Unless `episode_title_only` is set, entry titles are prefixed with the
/// playlist title.
pub fn media_tracks(
    media: &MediaPlaylist,
    base_url: &Url,
    title: &str,
    episode_title_only: bool,
) -> Result<Vec<PlaylistTrack>, ExtractorError> {
    media
        .segments
        .iter()
        .map(|segment| {
            let url = base_url.join(&segment.uri).map_err(|e| {
                ExtractorError::playlist(base_url.as_str(), format!("bad entry uri: {e}"))
            })?;
            let episode = segment
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| utils::name_and_ext(&url, "").0);
            let title = if episode_title_only {
                episode
            } else {
                format!("{title} {episode}")
            };
            Ok(PlaylistTrack {
                url: url.to_string(),
                title,
            })
        })
        .collect()
}

fn segments_stream(
    id: &str,
    media: &MediaPlaylist,
    base_url: &Url,
) -> Result<Stream, ExtractorError> {
    let parts = media
        .segments
        .iter()
        .map(|segment| {
            let url = base_url.join(&segment.uri).map_err(|e| {
                ExtractorError::playlist(base_url.as_str(), format!("bad segment uri: {e}"))
            })?;
            let ext = utils::url_ext(&url).unwrap_or_else(|| "ts".to_string());
            Ok(Part::new(url.to_string(), 0, ext))
        })
        .collect::<Result<Vec<_>, ExtractorError>>()?;

    if parts.is_empty() {
        return Err(ExtractorError::playlist(
            base_url.as_str(),
            "media playlist has no segments",
        ));
    }
    Ok(Stream::new(id).with_parts(parts))
}
