use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
    Image,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Image => "image",
        }
    }

    /// Classifies a `Content-Type` value such as `video/mp4; charset=binary`.
    ///
    /// Anything that is not audio or image is treated as video.
    pub fn from_mime(mime: &str) -> Self {
        let main = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if main.starts_with("audio/") {
            MediaType::Audio
        } else if main.starts_with("image/") {
            MediaType::Image
        } else {
            MediaType::Video
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
