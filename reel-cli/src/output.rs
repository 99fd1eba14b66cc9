#[cfg(feature = "colored-output")]
use colored::*;
use reel_downloader::DownloadOutcome;
use reel_extractor::media::{Data, Stream};

use crate::error::Result;

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Item header plus every stream, biggest first.
    pub fn format_info(&self, data: &Data) -> String {
        let mut output = self.format_header(data);
        output.push_str(&format!(
            " {}   # All available quality\n",
            self.colorize("Streams:", &Color::Cyan, false)
        ));
        for stream in data.sorted_streams() {
            output.push_str(&self.format_stream(stream, &data.url));
        }
        output
    }

    /// Item header plus the stream about to be downloaded.
    pub fn format_selected(&self, data: &Data, stream: &Stream) -> String {
        let mut output = self.format_header(data);
        output.push_str(&format!(
            " {}\n",
            self.colorize("Stream:", &Color::Cyan, false)
        ));
        output.push_str(&self.format_stream(stream, &data.url));
        output
    }

    pub fn format_json(&self, items: &[Data]) -> Result<String> {
        Ok(serde_json::to_string_pretty(items)?)
    }

    pub fn format_outcome(&self, outcome: &DownloadOutcome) -> String {
        let (label, paths) = match outcome {
            DownloadOutcome::Skipped(_) => ("Already exists:", outcome.paths()),
            DownloadOutcome::Downloaded(_) => ("Saved:", outcome.paths()),
            DownloadOutcome::Merged(_) => ("Merged:", outcome.paths()),
            DownloadOutcome::Parts(_) => ("Saved parts:", outcome.paths()),
        };
        let mut output = String::new();
        for path in paths {
            output.push_str(&format!(
                " {} {}\n",
                self.colorize(label, &Color::Green, true),
                path.display()
            ));
        }
        output
    }

    pub fn format_error(&self, url: &str, error: &dyn std::fmt::Display) -> String {
        format!(
            "{} {}: {}",
            self.colorize("Error:", &Color::Red, true),
            url,
            error
        )
    }

    fn format_header(&self, data: &Data) -> String {
        let mut output = String::from("\n");
        for (label, value) in [
            ("Site:", data.site.as_str()),
            ("Title:", data.title.as_str()),
            ("Type:", data.media_type.as_str()),
        ] {
            output.push_str(&format!(
                " {:<10} {}\n",
                self.colorize(label, &Color::Cyan, false),
                value
            ));
        }
        output
    }

    fn format_stream(&self, stream: &Stream, url: &str) -> String {
        let mut output = self.colorize(
            &format!("     [{}]  -------------------", stream.id),
            &Color::Blue,
            true,
        );
        output.push('\n');
        if !stream.quality.is_empty() {
            output.push_str(&format!(
                "     {:<16} {}\n",
                self.colorize("Quality:", &Color::Yellow, false),
                stream.quality
            ));
        }
        output.push_str(&format!(
            "     {:<16} {}\n",
            self.colorize("Size:", &Color::Yellow, false),
            format_size(stream.effective_size())
        ));
        output.push_str(&format!(
            "     # download with: reel -f {} \"{}\"\n\n",
            stream.id, url
        ));
        output
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                    Color::Red => text.red(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
    Red,
}

/// `1.50 MiB (1572864 Bytes)`
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MiB ({} Bytes)", bytes as f64 / 1024.0 / 1024.0, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_extractor::media::{MediaType, Part};
    use std::path::PathBuf;

    fn sample() -> Data {
        let mut data = Data::new("Universal", "clip", MediaType::Video, "https://site.test/v/1")
            .with_stream(
                Stream::new("360p").with_part(Part::new("https://cdn.test/a.mp4", 1024, "mp4")),
            )
            .with_stream(
                Stream::new("720p")
                    .with_quality("720p HD")
                    .with_part(Part::new("https://cdn.test/b.mp4", 1_572_864, "mp4")),
            );
        data.fill_up_streams();
        data
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(1_572_864), "1.50 MiB (1572864 Bytes)");
        assert_eq!(format_size(0), "0.00 MiB (0 Bytes)");
    }

    #[test]
    fn test_info_lists_biggest_first() {
        let text = OutputManager::new(false).format_info(&sample());
        let hd = text.find("[720p]").unwrap();
        let sd = text.find("[360p]").unwrap();
        assert!(hd < sd);
        assert!(text.contains("Title:"));
        assert!(text.contains("720p HD"));
        assert!(text.contains("reel -f 720p \"https://site.test/v/1\""));
    }

    #[test]
    fn test_selected_shows_one_stream() {
        let data = sample();
        let stream = data.stream("360p").unwrap();
        let text = OutputManager::new(false).format_selected(&data, stream);
        assert!(text.contains("[360p]"));
        assert!(!text.contains("[720p]"));
    }

    #[test]
    fn test_json_contains_items() {
        let json = OutputManager::new(false).format_json(&[sample()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["title"], "clip");
        assert_eq!(value[0]["streams"][1]["id"], "720p");
    }

    #[test]
    fn test_outcome_lists_paths() {
        let outcome =
            DownloadOutcome::Parts(vec![PathBuf::from("a[0].jpg"), PathBuf::from("a[1].jpg")]);
        let text = OutputManager::new(false).format_outcome(&outcome);
        assert!(text.contains("a[0].jpg"));
        assert!(text.contains("a[1].jpg"));
    }
}
