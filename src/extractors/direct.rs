use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use url::Url;

use super::{AudioFormat, MediaExtractor, MediaProbe};
use crate::session::MediaSourceKind;
use crate::Result;

/// Direct URL extractor for audio and video files
pub struct DirectExtractor {
    client: Client,
}

impl DirectExtractor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Determine audio format from URL or content type
    fn determine_format(&self, url: &str, content_type: Option<&str>) -> AudioFormat {
        let from_extension = Self::filename_from_url(url)
            .and_then(|name| {
                Path::new(&name)
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
            })
            .and_then(|ext| AudioFormat::from_extension(&ext));
        if let Some(format) = from_extension {
            return format;
        }

        if let Some(content_type) = content_type {
            match content_type {
                ct if ct.contains("mp3") || ct.contains("mpeg") => return AudioFormat::Mp3,
                ct if ct.contains("mp4") || ct.contains("m4a") => return AudioFormat::M4a,
                ct if ct.contains("wav") => return AudioFormat::Wav,
                ct if ct.contains("flac") => return AudioFormat::Flac,
                ct if ct.contains("ogg") => return AudioFormat::Ogg,
                ct if ct.contains("webm") => return AudioFormat::Webm,
                _ => {}
            }
        }

        AudioFormat::Mp3
    }

    /// Check if URL points to an audio or video file
    fn is_media_url(&self, url: &str) -> bool {
        let url_lower = url.to_lowercase();

        let media_extensions = [
            ".mp3", ".m4a", ".wav", ".flac", ".ogg", ".aac", ".mp4", ".avi", ".mov", ".mkv",
            ".webm", ".m4v",
        ];

        media_extensions.iter().any(|ext| url_lower.contains(ext))
    }

    /// Get content information via HEAD request
    async fn get_content_info(&self, url: &str) -> Result<(Option<String>, Option<u64>)> {
        let response = self.client.head(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to access URL: HTTP {}", response.status());
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|ct| ct.to_str().ok())
            .map(|s| s.to_string());

        let content_length = response
            .headers()
            .get("content-length")
            .and_then(|cl| cl.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        Ok((content_type, content_length))
    }

    fn filename_from_url(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()?
            .path_segments()?
            .last()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }
}

#[async_trait]
impl MediaExtractor for DirectExtractor {
    async fn probe(&self, url: &str) -> Result<MediaProbe> {
        super::validate_url(url)?;

        let (content_type, file_size) = self.get_content_info(url).await?;
        let format = self.determine_format(url, content_type.as_deref());

        // Direct URLs carry no duration metadata; the caller probes the
        // downloaded file with ffprobe when it needs one.
        Ok(MediaProbe {
            source: url.to_string(),
            title: Self::filename_from_url(url),
            uploader: None,
            duration_seconds: None,
            format,
            file_size,
            kind: MediaSourceKind::Url,
        })
    }

    async fn fetch_audio(&self, url: &str, output_path: &Path) -> Result<AudioFormat> {
        use futures_util::StreamExt;
        use std::io::Write;

        let probe = self.probe(url).await?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to download audio: HTTP {}", response.status());
        }

        let mut file = fs_err::File::create(output_path)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
        }

        Ok(probe.format)
    }

    fn supports_url(&self, url: &str) -> bool {
        url.starts_with("http") && self.is_media_url(url)
    }

    fn platform_name(&self) -> &'static str {
        "Direct URL"
    }
}

impl Default for DirectExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_media_urls_only() {
        let extractor = DirectExtractor::new();
        assert!(extractor.supports_url("https://cdn.example.com/lesson.mp3"));
        assert!(extractor.supports_url("https://cdn.example.com/video.mp4"));
        assert!(!extractor.supports_url("https://example.com/page.html"));
    }

    #[test]
    fn test_determine_format_from_extension() {
        let extractor = DirectExtractor::new();
        assert_eq!(
            extractor
                .determine_format("https://x.com/a.flac", None)
                .as_str(),
            "flac"
        );
        assert_eq!(
            extractor
                .determine_format("https://x.com/a", Some("audio/ogg"))
                .as_str(),
            "ogg"
        );
        assert_eq!(
            extractor.determine_format("https://x.com/a", None).as_str(),
            "mp3"
        );
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            DirectExtractor::filename_from_url("https://x.com/audio/lesson1.mp3"),
            Some("lesson1.mp3".to_string())
        );
        assert_eq!(DirectExtractor::filename_from_url("https://x.com/"), None);
    }
}
