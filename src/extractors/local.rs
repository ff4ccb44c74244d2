use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

use super::{AudioFormat, MediaExtractor, MediaProbe};
use crate::session::MediaSourceKind;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "m4v", "webm"];

/// Extractor for uploaded local audio/video files, probed with ffprobe
pub struct LocalFileExtractor;

impl LocalFileExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Check if the file exists and is accessible
    async fn validate_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("File does not exist: {}", path.display());
        }

        if !path.is_file() {
            anyhow::bail!("Path is not a file: {}", path.display());
        }

        match fs::metadata(path).await {
            Ok(metadata) => {
                if metadata.len() == 0 {
                    anyhow::bail!("File is empty: {}", path.display());
                }
            }
            Err(e) => {
                anyhow::bail!("Cannot access file {}: {}", path.display(), e);
            }
        }

        Ok(())
    }

    /// Get duration and codec information using ffprobe
    async fn get_file_info(&self, path: &Path) -> Result<Option<f64>> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                &path.to_string_lossy(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to analyze file with ffprobe: {}", error);
        }

        let info: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        let duration = info["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok());

        Ok(duration)
    }

    fn classify(path: &Path) -> (MediaSourceKind, AudioFormat) {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if let Some(format) = AudioFormat::from_extension(&extension) {
            // Webm carries either; treat a bare .webm as video
            if extension == "webm" {
                return (MediaSourceKind::Video, format);
            }
            return (MediaSourceKind::Audio, format);
        }
        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            return (MediaSourceKind::Video, AudioFormat::Mp3);
        }
        (MediaSourceKind::Unknown, AudioFormat::Mp3)
    }

    /// Extract the audio track of a video file into an mp3 using ffmpeg
    async fn extract_audio_track(&self, input: &Path, output_path: &Path) -> Result<()> {
        let output = Command::new("ffmpeg")
            .args([
                "-y",
                "-i",
                &input.to_string_lossy(),
                "-vn",
                "-acodec",
                "libmp3lame",
                "-q:a",
                "7",
                &output_path.to_string_lossy(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg audio extraction failed: {}", error);
        }
        Ok(())
    }
}

#[async_trait]
impl MediaExtractor for LocalFileExtractor {
    async fn probe(&self, input: &str) -> Result<MediaProbe> {
        let path = PathBuf::from(input);
        self.validate_file(&path).await?;

        let duration_seconds = self.get_file_info(&path).await?;
        let (kind, format) = Self::classify(&path);
        let file_size = fs::metadata(&path).await.ok().map(|m| m.len());

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());

        Ok(MediaProbe {
            source: input.to_string(),
            title,
            uploader: None,
            duration_seconds,
            format,
            file_size,
            kind,
        })
    }

    async fn fetch_audio(&self, input: &str, output_path: &Path) -> Result<AudioFormat> {
        let path = PathBuf::from(input);
        self.validate_file(&path).await?;

        let (kind, format) = Self::classify(&path);
        if kind == MediaSourceKind::Audio {
            fs::copy(&path, output_path).await?;
            return Ok(format);
        }

        self.extract_audio_track(&path, output_path).await?;
        Ok(AudioFormat::Mp3)
    }

    fn supports_url(&self, input: &str) -> bool {
        !input.starts_with("http://") && !input.starts_with("https://")
    }

    fn platform_name(&self) -> &'static str {
        "Local file"
    }
}

impl Default for LocalFileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        let (kind, format) = LocalFileExtractor::classify(Path::new("a.mp3"));
        assert_eq!(kind, MediaSourceKind::Audio);
        assert_eq!(format.as_str(), "mp3");

        let (kind, _) = LocalFileExtractor::classify(Path::new("a.mkv"));
        assert_eq!(kind, MediaSourceKind::Video);

        let (kind, _) = LocalFileExtractor::classify(Path::new("a.xyz"));
        assert_eq!(kind, MediaSourceKind::Unknown);
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_file() {
        let extractor = LocalFileExtractor::new();
        assert!(extractor
            .validate_file(Path::new("/no/such/file.mp3"))
            .await
            .is_err());
    }
}
