use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;
use uuid::Uuid;

pub mod audio;
pub mod direct;
pub mod local;
pub mod youtube;

use crate::session::{MediaSource, MediaSourceKind};
use crate::Result;

/// What probing a media input revealed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// URL or file path that was probed
    pub source: String,

    /// Title or file name of the media
    pub title: Option<String>,

    /// Uploader/channel, when the platform reports one
    pub uploader: Option<String>,

    /// Duration in seconds if known
    pub duration_seconds: Option<f64>,

    /// Audio format the download will produce
    pub format: AudioFormat,

    /// File size in bytes if known
    pub file_size: Option<u64>,

    /// Kind of media source this probe came from
    pub kind: MediaSourceKind,
}

impl MediaProbe {
    /// Turn a probe into a registered media source.
    ///
    /// The id is derived from the source location, so registering the same
    /// file or URL again lands on the same session slot and the same
    /// segment-length preference key instead of minting a new identity.
    pub fn into_media_source(self, language: &str) -> MediaSource {
        let display_name = self.title.clone().unwrap_or_else(|| self.source.clone());
        MediaSource {
            id: Uuid::new_v5(&Uuid::NAMESPACE_URL, self.source.as_bytes()).to_string(),
            src: self.source,
            display_name,
            kind: self.kind,
            duration: self.duration_seconds.unwrap_or(0.0),
            language: language.to_string(),
        }
    }
}

/// Supported audio formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Webm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Webm => "webm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" => Some(AudioFormat::Ogg),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Webm => "audio/webm",
        }
    }
}

/// Trait for probing and fetching media from different platforms
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Probe a URL for metadata without downloading it
    async fn probe(&self, url: &str) -> Result<MediaProbe>;

    /// Download the audio track to the given path
    async fn fetch_audio(&self, url: &str, output_path: &Path) -> Result<AudioFormat>;

    /// Check if this extractor supports the given URL
    fn supports_url(&self, url: &str) -> bool;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;
}

/// Registry for managing multiple extractors
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn MediaExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new registry with default extractors
    pub fn new() -> Self {
        let mut registry = Self {
            extractors: Vec::new(),
        };

        registry.register(Box::new(youtube::YoutubeExtractor::new()));
        registry.register(Box::new(direct::DirectExtractor::new()));

        registry
    }

    /// Create local file extractor (not stored in registry since it's handled differently)
    pub fn create_local_extractor() -> local::LocalFileExtractor {
        local::LocalFileExtractor::new()
    }

    /// Register a new extractor
    pub fn register(&mut self, extractor: Box<dyn MediaExtractor>) {
        self.extractors.push(extractor);
    }

    /// Find an extractor that supports the given URL
    pub fn find_extractor(&self, url: &str) -> Option<&dyn MediaExtractor> {
        self.extractors
            .iter()
            .find(|extractor| extractor.supports_url(url))
            .map(|boxed| boxed.as_ref())
    }

    /// List all supported platforms
    pub fn list_platforms(&self) -> Vec<&'static str> {
        self.extractors
            .iter()
            .map(|extractor| extractor.platform_name())
            .collect()
    }

    /// Check if input is a local file path
    pub fn is_local_file(&self, input: &str) -> bool {
        if input.starts_with("http://") || input.starts_with("https://") {
            return false;
        }

        let path = std::path::Path::new(input);
        if path.exists() {
            return true;
        }

        // Looks like a file path: extension, separators, or a leading dot
        let has_extension = path.extension().is_some();
        let has_path_separators = input.contains('/') || input.contains('\\');
        let starts_with_dot = input.starts_with("./") || input.starts_with(".\\");

        has_extension || has_path_separators || starts_with_dot
    }

    /// Probe an input using the appropriate extractor
    pub async fn probe(&self, input: &str) -> Result<MediaProbe> {
        if self.is_local_file(input) {
            let local_extractor = Self::create_local_extractor();
            return local_extractor.probe(input).await;
        }

        let extractor = self
            .find_extractor(input)
            .ok_or_else(|| anyhow::anyhow!("No extractor found for URL: {}", input))?;

        extractor.probe(input).await
    }

    /// Fetch the audio track for an input using the appropriate extractor
    pub async fn fetch_audio(&self, input: &str, output_path: &Path) -> Result<AudioFormat> {
        if self.is_local_file(input) {
            let local_extractor = Self::create_local_extractor();
            return local_extractor.fetch_audio(input, output_path).await;
        }

        let extractor = self
            .find_extractor(input)
            .ok_or_else(|| anyhow::anyhow!("No extractor found for URL: {}", input))?;

        extractor.fetch_audio(input, output_path).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local_file() {
        let registry = ExtractorRegistry::new();
        assert!(!registry.is_local_file("https://www.youtube.com/watch?v=abc"));
        assert!(registry.is_local_file("./lesson.mp4"));
        assert!(registry.is_local_file("audio/lesson.mp3"));
        assert!(registry.is_local_file("lesson.wav"));
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = ExtractorRegistry::new();
        assert_eq!(
            registry
                .find_extractor("https://youtu.be/abc123")
                .unwrap()
                .platform_name(),
            "YouTube"
        );
        assert_eq!(
            registry
                .find_extractor("https://cdn.example.com/audio.mp3")
                .unwrap()
                .platform_name(),
            "Direct URL"
        );
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
    }

    fn probe_of(src: &str) -> MediaProbe {
        MediaProbe {
            source: src.to_string(),
            title: Some("Lesson 1".to_string()),
            uploader: None,
            duration_seconds: Some(95.0),
            format: AudioFormat::Mp3,
            file_size: None,
            kind: MediaSourceKind::Url,
        }
    }

    #[test]
    fn test_probe_into_media_source() {
        let source = probe_of("https://youtu.be/abc").into_media_source("english");
        assert_eq!(source.display_name, "Lesson 1");
        assert_eq!(source.duration, 95.0);
        assert_eq!(source.language, "english");
    }

    #[test]
    fn test_media_source_id_stable_per_location() {
        let first = probe_of("https://youtu.be/abc").into_media_source("english");
        let again = probe_of("https://youtu.be/abc").into_media_source("english");
        assert_eq!(first.id, again.id);

        let other = probe_of("https://youtu.be/def").into_media_source("english");
        assert_ne!(first.id, other.id);
    }
}
