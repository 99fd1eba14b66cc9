use serde::{Deserialize, Serialize};

/// One physically fetchable resource segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub url: String,
    /// Byte length, `0` when unknown or not measured yet.
    pub size: u64,
    pub ext: String,
}

impl Part {
    pub fn new(url: impl Into<String>, size: u64, ext: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size,
            ext: ext.into(),
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// One selectable rendition of a media item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub quality: String,
    pub parts: Vec<Part>,
    /// Sum of part sizes, `0` until filled.
    pub size: u64,
    /// Extension of the merged output.
    pub ext: String,
    /// Parts are separate audio and video tracks.
    pub need_mux: bool,
}

impl Stream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_parts(mut self, parts: impl IntoIterator<Item = Part>) -> Self {
        self.parts.extend(parts);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    pub fn with_need_mux(mut self, need_mux: bool) -> Self {
        self.need_mux = need_mux;
        self
    }

    /// Sum of the part sizes. Unknown parts contribute zero.
    pub fn compute_size(&self) -> u64 {
        self.parts
            .iter()
            .fold(0u64, |acc, part| acc.saturating_add(part.size))
    }

    /// Fills `size` from the parts if it has not been set.
    pub fn fill_size(&mut self) {
        if self.size == 0 {
            self.size = self.compute_size();
        }
    }

    /// Size used for ordering: the stored size, or the part sum when unset.
    pub fn effective_size(&self) -> u64 {
        if self.size > 0 {
            self.size
        } else {
            self.compute_size()
        }
    }

    pub fn is_multi_part(&self) -> bool {
        self.parts.len() > 1
    }

    /// Fills the display defaults: quality falls back to the id, the output
    /// extension to the first part's, and the size to the part sum.
    pub fn fill_up(&mut self) {
        if self.quality.is_empty() {
            self.quality = self.id.clone();
        }
        if self.ext.is_empty() {
            if let Some(first) = self.parts.first() {
                self.ext = merged_ext(&first.ext).to_string();
            }
        }
        self.fill_size();
    }
}

/// Container produced when parts with `ext` get merged.
fn merged_ext(ext: &str) -> &str {
    match ext {
        "ts" | "flv" | "f4v" => "mp4",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_with_sizes(sizes: &[u64]) -> Stream {
        Stream::new("s").with_parts(
            sizes
                .iter()
                .enumerate()
                .map(|(i, s)| Part::new(format!("https://cdn.test/{i}.ts"), *s, "ts")),
        )
    }

    #[test]
    fn test_compute_size_tolerates_unknown_parts() {
        let stream = stream_with_sizes(&[100, 0, 50]);
        assert_eq!(stream.compute_size(), 150);
        assert_eq!(stream.compute_size(), 150);
    }

    #[test]
    fn test_fill_size_is_idempotent() {
        let mut stream = stream_with_sizes(&[100, 0, 50]);
        stream.fill_size();
        assert_eq!(stream.size, 150);
        stream.fill_size();
        assert_eq!(stream.size, 150);
    }

    #[test]
    fn test_fill_size_keeps_explicit_size() {
        let mut stream = stream_with_sizes(&[1, 2]).with_size(999);
        stream.fill_size();
        assert_eq!(stream.size, 999);
    }

    #[test]
    fn test_fill_up_defaults() {
        let mut stream = stream_with_sizes(&[10, 20]);
        stream.fill_up();
        assert_eq!(stream.quality, "s");
        assert_eq!(stream.ext, "mp4");
        assert_eq!(stream.size, 30);

        let mut audio = Stream::new("a")
            .with_quality("128k")
            .with_part(Part::new("https://cdn.test/a.m4a", 5, "m4a"));
        audio.fill_up();
        assert_eq!(audio.quality, "128k");
        assert_eq!(audio.ext, "m4a");
    }

    #[test]
    fn test_part_usable() {
        assert!(Part::new("https://cdn.test/a.mp4", 0, "mp4").is_usable());
        assert!(!Part::new("  ", 10, "mp4").is_usable());
    }
}
