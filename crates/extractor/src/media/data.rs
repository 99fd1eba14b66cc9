use std::{cmp::Reverse, sync::Arc};

use serde::{Serialize, Serializer};

use crate::{
    extractor::ExtractorError,
    media::{MediaType, Part, Stream},
};

/// One logical downloadable item produced by an extraction.
///
/// A `Data` either carries streams or an error, never both. Items that failed
/// inside a playlist keep their source url and error so the batch can go on;
/// they must not be handed to the downloader.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Data {
    pub url: String,
    pub site: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    streams: Vec<Stream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<Part>,
    #[serde(
        rename = "err",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    error: Option<Arc<ExtractorError>>,
}

impl Data {
    pub fn new(
        site: impl Into<String>,
        title: impl Into<String>,
        media_type: MediaType,
        url: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            site: site.into(),
            title: title.into(),
            media_type,
            ..Default::default()
        }
    }

    /// Placeholder for an item whose extraction failed.
    pub fn failed(url: impl Into<String>, error: ExtractorError) -> Self {
        Self {
            url: url.into(),
            error: Some(Arc::new(error)),
            ..Default::default()
        }
    }

    pub fn with_stream(mut self, stream: Stream) -> Self {
        self.insert_stream(stream);
        self
    }

    pub fn with_caption(mut self, caption: Part) -> Self {
        self.caption = Some(caption);
        self
    }

    /// Adds a stream, replacing in place any sibling with the same id.
    pub fn insert_stream(&mut self, stream: Stream) {
        match self.streams.iter_mut().find(|s| s.id == stream.id) {
            Some(existing) => *existing = stream,
            None => self.streams.push(stream),
        }
    }

    /// Streams in insertion order.
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn stream(&self, id: &str) -> Option<&Stream> {
        self.streams.iter().find(|s| s.id == id)
    }

    pub fn stream_ids(&self) -> Vec<String> {
        self.streams.iter().map(|s| s.id.clone()).collect()
    }

    pub fn error(&self) -> Option<&ExtractorError> {
        self.error.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Fills quality, extension and size defaults on every stream.
    pub fn fill_up_streams(&mut self) {
        for stream in &mut self.streams {
            stream.fill_up();
        }
    }

    /// Streams ordered by descending size, biggest first.
    ///
    /// The sort is stable: streams of equal size keep their insertion order,
    /// so the listing is identical from run to run.
    pub fn sorted_streams(&self) -> Vec<&Stream> {
        let mut sorted: Vec<&Stream> = self.streams.iter().collect();
        sorted.sort_by_key(|s| Reverse(s.effective_size()));
        sorted
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<Arc<ExtractorError>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(id: &str, size: u64) -> Stream {
        Stream::new(id)
            .with_part(Part::new(format!("https://cdn.test/{id}.mp4"), size, "mp4"))
            .with_size(size)
    }

    #[test]
    fn test_sorted_streams_is_stable() {
        let data = Data::new("test", "clip", MediaType::Video, "https://site.test/v/1")
            .with_stream(stream("a", 10))
            .with_stream(stream("b", 30))
            .with_stream(stream("c", 30))
            .with_stream(stream("d", 5));

        let ids: Vec<&str> = data.sorted_streams().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);

        let again: Vec<&str> = data.sorted_streams().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, again);
    }

    #[test]
    fn test_sorted_streams_uses_part_sum_when_size_unset() {
        let lazy = Stream::new("lazy")
            .with_part(Part::new("https://cdn.test/1.ts", 40, "ts"))
            .with_part(Part::new("https://cdn.test/2.ts", 40, "ts"));
        let data = Data::new("test", "clip", MediaType::Video, "https://site.test/v/1")
            .with_stream(stream("small", 50))
            .with_stream(lazy);

        assert_eq!(data.sorted_streams()[0].id, "lazy");
    }

    #[test]
    fn test_insert_stream_replaces_same_id() {
        let mut data = Data::new("test", "clip", MediaType::Video, "https://site.test/v/1")
            .with_stream(stream("a", 1))
            .with_stream(stream("b", 2));
        data.insert_stream(stream("a", 7));

        assert_eq!(data.stream_ids(), vec!["a", "b"]);
        assert_eq!(data.stream("a").map(|s| s.size), Some(7));
    }

    #[test]
    fn test_failed_data() {
        let data = Data::failed(
            "https://site.test/v/3",
            ExtractorError::parse_failure("https://site.test/v/3", "title not found"),
        );
        assert!(data.is_failed());
        assert!(data.streams().is_empty());

        let json = data.to_json().unwrap();
        assert!(json.contains("\"err\""));
        assert!(json.contains("title not found"));
    }

    #[test]
    fn test_json_omits_missing_error() {
        let data = Data::new("test", "clip", MediaType::Audio, "https://site.test/a/1")
            .with_stream(stream("a", 1));
        let json = data.to_json().unwrap();
        assert!(!json.contains("\"err\""));
        assert!(json.contains("\"type\":\"audio\""));
    }
}
