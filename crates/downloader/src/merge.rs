//! Lossless joining of downloaded parts through ffmpeg.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::MergeError;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Joins part files into a single output.
#[async_trait]
pub trait Merger: Send + Sync {
    /// Appends same-type segments one after another.
    async fn concat(&self, parts: &[PathBuf], output: &Path) -> Result<(), MergeError>;

    /// Combines separate audio and video tracks into one container.
    async fn mux(&self, parts: &[PathBuf], output: &Path) -> Result<(), MergeError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegMerger {
    binary_path: PathBuf,
}

impl Default for FfmpegMerger {
    fn default() -> Self {
        Self::locate()
    }
}

impl FfmpegMerger {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Prefers an ffmpeg binary in the working directory, then `PATH`.
    pub fn locate() -> Self {
        let local = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
        let local = Path::new(".").join(local);
        if local.is_file() {
            Self::new(local)
        } else {
            Self::new("ffmpeg")
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn run(&self, args: &[&OsStr]) -> Result<(), MergeError> {
        debug!(binary = %self.binary_path.display(), ?args, "Running ffmpeg");
        let output = ffmpeg_command(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    MergeError::ToolNotFound(self.binary_path.display().to_string())
                }
                _ => MergeError::Io(e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MergeError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// ffmpeg command without a console window on Windows.
fn ffmpeg_command(program: impl AsRef<OsStr>) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

/// `-y -i a -i b -c:v copy -c:a copy out`
pub fn mux_args(parts: &[PathBuf], output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];
    for part in parts {
        args.extend(["-i".to_string(), part.display().to_string()]);
    }
    args.extend([
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        output.display().to_string(),
    ]);
    args
}

/// `-y -f concat -safe 0 -i list -c copy -bsf:a aac_adtstoasc out`
pub fn concat_args(list_file: &Path, output: &Path) -> Vec<String> {
    [
        "-y",
        "-hide_banner",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([list_file.display().to_string()])
    .chain(
        ["-c", "copy", "-bsf:a", "aac_adtstoasc"]
            .iter()
            .map(|s| s.to_string()),
    )
    .chain([output.display().to_string()])
    .collect()
}

/// Body of an ffmpeg concat list, one `file '<path>'` line per part.
pub fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', r"'\''")))
        .collect()
}

fn list_file_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".concat.txt");
    PathBuf::from(name)
}

#[async_trait]
impl Merger for FfmpegMerger {
    async fn concat(&self, parts: &[PathBuf], output: &Path) -> Result<(), MergeError> {
        if parts.is_empty() {
            return Err(MergeError::NoInputs);
        }
        // The concat demuxer resolves relative entries against the list file.
        let absolute = parts
            .iter()
            .map(std::path::absolute)
            .collect::<Result<Vec<_>, _>>()?;
        let list_file = list_file_path(output);
        tokio::fs::write(&list_file, concat_list(&absolute)).await?;

        info!(parts = parts.len(), output = %output.display(), "Concatenating parts");
        let args = concat_args(&list_file, output);
        let args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
        let result = self.run(&args).await;

        let _ = tokio::fs::remove_file(&list_file).await;
        result
    }

    async fn mux(&self, parts: &[PathBuf], output: &Path) -> Result<(), MergeError> {
        if parts.is_empty() {
            return Err(MergeError::NoInputs);
        }
        info!(parts = parts.len(), output = %output.display(), "Muxing tracks");
        let args = mux_args(parts, output);
        let args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
        self.run(&args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_args() {
        let args = mux_args(
            &[PathBuf::from("clip[0].mp4"), PathBuf::from("clip[1].m4a")],
            Path::new("clip.mp4"),
        );
        assert_eq!(
            args,
            vec![
                "-y",
                "-hide_banner",
                "-i",
                "clip[0].mp4",
                "-i",
                "clip[1].m4a",
                "-c:v",
                "copy",
                "-c:a",
                "copy",
                "clip.mp4"
            ]
        );
    }

    #[test]
    fn test_concat_args() {
        let args = concat_args(Path::new("clip.mp4.concat.txt"), Path::new("clip.mp4"));
        assert_eq!(
            args,
            vec![
                "-y",
                "-hide_banner",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "clip.mp4.concat.txt",
                "-c",
                "copy",
                "-bsf:a",
                "aac_adtstoasc",
                "clip.mp4"
            ]
        );
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/tmp/a[0].ts"), PathBuf::from("/tmp/it's[1].ts")]);
        assert_eq!(list, "file '/tmp/a[0].ts'\nfile '/tmp/it'\\''s[1].ts'\n");
    }

    #[test]
    fn test_list_file_path() {
        assert_eq!(
            list_file_path(Path::new("out/clip.mp4")),
            PathBuf::from("out/clip.mp4.concat.txt")
        );
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let merger = FfmpegMerger::new("/nonexistent/reel-ffmpeg");
        let err = merger
            .mux(&[PathBuf::from("a.mp4")], Path::new("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_inputs() {
        let merger = FfmpegMerger::new("ffmpeg");
        assert!(matches!(
            merger.concat(&[], Path::new("out.mp4")).await,
            Err(MergeError::NoInputs)
        ));
    }
}
